//! Golden test vectors for deterministic verification.
//!
//! Notarisation payloads and burn descriptors are read by every node on
//! every chain, so their byte layout must never drift. Each vector pins
//! the serialised form of one record.

use crosschain_core::{
    hash256, merkle_root, serialize, BackNotarisation, BurnDescriptor, Hash256, NotarisationData,
};

/// A golden encoding vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Serialised record.
    pub bytes: Vec<u8>,
    /// Expected serialisation (hex).
    pub expected_hex: &'static str,
}

pub fn forward_notarisation_vector() -> NotarisationData {
    NotarisationData {
        block_hash: Hash256([0x11; 32]),
        height: 500,
        symbol: "ASSETA".into(),
        mom: Hash256([0x22; 32]),
        mom_depth: 10,
        cc_id: 200,
        back: None,
    }
}

pub fn back_notarisation_vector() -> NotarisationData {
    NotarisationData {
        block_hash: Hash256([0x33; 32]),
        height: 1000,
        symbol: "ASSETB".into(),
        mom: Hash256([0x55; 32]),
        mom_depth: 20,
        cc_id: 200,
        back: Some(BackNotarisation {
            tx_hash: Hash256([0x44; 32]),
            mom_mom: Hash256([0x66; 32]),
            mom_mom_depth: 1440,
        }),
    }
}

pub fn burn_descriptor_vector() -> BurnDescriptor {
    BurnDescriptor {
        target_cc_id: 300,
        target_symbol: "ASSETB".into(),
        payouts_hash: Hash256([0x77; 32]),
        raw_proof: Vec::new(),
        token: None,
    }
}

/// Get all golden encoding vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "forward notarisation",
            bytes: serialize(&forward_notarisation_vector()),
            expected_hex: concat!(
                "1111111111111111111111111111111111111111111111111111111111111111",
                "f4010000",
                "41535345544100",
                "2222222222222222222222222222222222222222222222222222222222222222",
                "0a00",
                "c800",
            ),
        },
        GoldenVector {
            name: "back-notarisation",
            bytes: serialize(&back_notarisation_vector()),
            expected_hex: concat!(
                "3333333333333333333333333333333333333333333333333333333333333333",
                "e8030000",
                "4444444444444444444444444444444444444444444444444444444444444444",
                "41535345544200",
                "5555555555555555555555555555555555555555555555555555555555555555",
                "1400",
                "c800",
                "6666666666666666666666666666666666666666666666666666666666666666",
                "a0050000",
            ),
        },
        GoldenVector {
            name: "burn descriptor",
            bytes: serialize(&burn_descriptor_vector()),
            expected_hex: concat!(
                "e2",
                "812c",
                "06415353455442",
                "7777777777777777777777777777777777777777777777777777777777777777",
                "00",
                "00",
            ),
        },
    ]
}

/// Leaves and root of a three-leaf tree, exercising odd-layer duplication.
pub fn merkle_vector() -> (Vec<Hash256>, &'static str) {
    (
        vec![hash256(b"a"), hash256(b"b"), hash256(b"c")],
        "74449b8328cb6e97d305adb2fca5e90993fdf9c667fa40cb625f40508da40cbf",
    )
}

/// Verify all golden vectors.
///
/// Returns `(name, matches, actual_hex)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    let mut results: Vec<_> = all_vectors()
        .into_iter()
        .map(|v| {
            let actual = hex::encode(&v.bytes);
            (v.name.to_string(), actual == v.expected_hex, actual)
        })
        .collect();

    let (leaves, expected) = merkle_vector();
    let root = merkle_root(&leaves).to_hex();
    results.push(("three-leaf merkle root".to_string(), root == expected, root));
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosschain_core::{deserialize, NotarisationContext};

    #[test]
    fn test_all_vectors_match() {
        for (name, matches, actual) in verify_all_vectors() {
            assert!(matches, "{name}: got {actual}");
        }
    }

    #[test]
    fn test_hash256_of_a() {
        assert_eq!(
            hash256(b"a").to_hex(),
            "bf5d3affb73efd2ec6c36ad3112dd933efed63c4e1cbffcfa88e2759c144f2d8"
        );
    }

    #[test]
    fn test_vectors_decode_in_context() {
        let forward = hex::decode(all_vectors()[0].expected_hex).unwrap();
        assert_eq!(
            NotarisationData::decode(&forward, NotarisationContext::Hub).unwrap(),
            forward_notarisation_vector()
        );

        let back = hex::decode(all_vectors()[1].expected_hex).unwrap();
        assert_eq!(
            NotarisationData::decode(&back, NotarisationContext::Assetchain).unwrap(),
            back_notarisation_vector()
        );

        let burn = hex::decode(all_vectors()[2].expected_hex).unwrap();
        assert_eq!(deserialize::<BurnDescriptor>(&burn).unwrap(), burn_descriptor_vector());
    }
}
