//! Notary sets and the directory that selects between them.
//!
//! The directory is injected configuration: seasonal sets for the hub
//! family, time-boxed eras for the staked family and the fixed TXSCL set.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crosschain_core::PublicKey;

use crate::error::{AuthorityError, Result};
use crate::family::AuthorityFamily;

/// Most notaries a single authority may list.
pub const MAX_NOTARIES: usize = 64;

/// Seconds between the end of one staked era and the start of the next.
/// Timestamps inside the gap belong to no era.
pub const STAKED_ERA_GAP: u32 = 777;

/// A notary set and its signing threshold.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrosschainAuthority {
    pub notaries: Vec<PublicKey>,
    pub required_sigs: usize,
}

impl CrosschainAuthority {
    pub fn new(notaries: Vec<PublicKey>, required_sigs: usize) -> Result<Self> {
        let authority = Self {
            notaries,
            required_sigs,
        };
        authority.validate()?;
        Ok(authority)
    }

    pub fn size(&self) -> usize {
        self.notaries.len()
    }

    pub fn contains(&self, pk: &PublicKey) -> bool {
        self.notaries.contains(pk)
    }

    pub fn validate(&self) -> Result<()> {
        if self.notaries.len() > MAX_NOTARIES {
            return Err(AuthorityError::TooManyNotaries(self.notaries.len()));
        }
        if self.required_sigs == 0 || self.required_sigs > self.notaries.len() {
            return Err(AuthorityError::InvalidThreshold {
                required: self.required_sigs,
                size: self.notaries.len(),
            });
        }
        let mut seen = HashSet::with_capacity(self.notaries.len());
        for pk in &self.notaries {
            if !seen.insert(pk) {
                return Err(AuthorityError::DuplicateNotary(pk.to_hex()));
            }
        }
        Ok(())
    }
}

/// A hub-family notary season.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotarySeason {
    /// First hub height the season applies to.
    pub start_height: u32,
    /// First timestamp the season applies to on other chains.
    pub start_time: u32,
    pub authority: CrosschainAuthority,
}

/// A staked era: inclusive timestamp window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EraWindow {
    pub start: u32,
    pub end: u32,
    pub authority: CrosschainAuthority,
}

impl EraWindow {
    /// Build eras from their cut-over timestamps.
    ///
    /// The first era runs up to and including `cutovers[0]`; era `i` starts
    /// `STAKED_ERA_GAP` seconds after `cutovers[i - 1]` and ends at
    /// `cutovers[i]`.
    pub fn from_cutovers(
        cutovers: &[u32],
        authorities: Vec<CrosschainAuthority>,
    ) -> Result<Vec<EraWindow>> {
        if cutovers.len() != authorities.len() {
            return Err(AuthorityError::EraCountMismatch {
                cutovers: cutovers.len(),
                authorities: authorities.len(),
            });
        }
        let eras: Vec<EraWindow> = authorities
            .into_iter()
            .enumerate()
            .map(|(i, authority)| EraWindow {
                start: if i == 0 {
                    0
                } else {
                    cutovers[i - 1].saturating_add(STAKED_ERA_GAP)
                },
                end: cutovers[i],
                authority,
            })
            .collect();
        validate_eras(&eras)?;
        Ok(eras)
    }

    pub fn contains(&self, timestamp: u32) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}

fn validate_eras(eras: &[EraWindow]) -> Result<()> {
    for (i, era) in eras.iter().enumerate() {
        era.authority.validate()?;
        if era.start > era.end {
            return Err(AuthorityError::OverlappingEras(i));
        }
        if i > 0 && era.start <= eras[i - 1].end.saturating_add(1) {
            return Err(AuthorityError::OverlappingEras(i));
        }
    }
    Ok(())
}

/// Access to notary sets by chain position.
pub trait NotaryLookup: Send + Sync {
    /// The hub family's notaries: by height on the hub, by timestamp
    /// elsewhere.
    fn notaries_for_height_and_time(
        &self,
        height: u32,
        timestamp: u32,
        is_hub: bool,
    ) -> Option<&CrosschainAuthority>;

    /// The staked authority in force at `timestamp`; `None` inside a gap.
    fn staked_authority(&self, timestamp: u32) -> Option<&CrosschainAuthority>;

    fn txscl_authority(&self) -> Option<&CrosschainAuthority>;

    /// The authority that must have signed a notarisation of `family`
    /// confirmed at (`height`, `timestamp`).
    fn authority_for(
        &self,
        family: AuthorityFamily,
        height: u32,
        timestamp: u32,
        is_hub: bool,
    ) -> Option<&CrosschainAuthority> {
        match family {
            AuthorityFamily::Komodo => self.notaries_for_height_and_time(height, timestamp, is_hub),
            AuthorityFamily::Staked => self.staked_authority(timestamp),
            AuthorityFamily::Txscl => self.txscl_authority(),
        }
    }
}

/// Every notary set known to a node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotaryDirectory {
    #[serde(default)]
    pub seasons: Vec<NotarySeason>,
    #[serde(default)]
    pub staked_eras: Vec<EraWindow>,
    #[serde(default)]
    pub txscl: Option<CrosschainAuthority>,
}

impl NotaryDirectory {
    /// Load and validate a directory from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let directory: Self = serde_json::from_str(json)?;
        directory.validate()?;
        Ok(directory)
    }

    pub fn validate(&self) -> Result<()> {
        for (i, season) in self.seasons.iter().enumerate() {
            season.authority.validate()?;
            if i > 0 {
                let prev = &self.seasons[i - 1];
                if season.start_height <= prev.start_height || season.start_time <= prev.start_time
                {
                    return Err(AuthorityError::UnorderedSeasons(i));
                }
            }
        }
        validate_eras(&self.staked_eras)?;
        if let Some(txscl) = &self.txscl {
            txscl.validate()?;
        }
        Ok(())
    }

    /// Index of the staked era containing `timestamp`.
    pub fn era_for_timestamp(&self, timestamp: u32) -> Option<usize> {
        self.staked_eras.iter().position(|era| era.contains(timestamp))
    }
}

impl NotaryLookup for NotaryDirectory {
    fn notaries_for_height_and_time(
        &self,
        height: u32,
        timestamp: u32,
        is_hub: bool,
    ) -> Option<&CrosschainAuthority> {
        self.seasons
            .iter()
            .rev()
            .find(|season| {
                if is_hub {
                    season.start_height <= height
                } else {
                    season.start_time <= timestamp
                }
            })
            .map(|season| &season.authority)
    }

    fn staked_authority(&self, timestamp: u32) -> Option<&CrosschainAuthority> {
        self.era_for_timestamp(timestamp)
            .map(|era| &self.staked_eras[era].authority)
    }

    fn txscl_authority(&self) -> Option<&CrosschainAuthority> {
        self.txscl.as_ref()
    }
}
