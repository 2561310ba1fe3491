//! Per-site occupancy automaton.
//!
//! ```text
//! Available --occupy--> Occupied
//! Available --hinder(c)--> Hindered{c}
//! Hindered{..} --hinder(c)--> Hindered{.., c}
//! Hindered{.., c} --unhinder(c)--> Hindered{..}, or Available once no cause is left
//! Occupied --release--> Available
//! Occupied --hinder/unhinder--> Occupied
//! ```

use crate::core::models::ids::{AdsorbateId, SiteId};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StatusError {
    #[error("Site is already occupied by adsorbate {0:?}")]
    AlreadyOccupied(AdsorbateId),
    #[error("Site is hindered by {0} neighboring site(s)")]
    Hindered(usize),
    #[error("Site is not occupied")]
    NotOccupied,
    #[error("Site is not hindered")]
    NotHindered,
    #[error("Site {0:?} is not among the hindering sites")]
    UnknownCause(SiteId),
}

/// The state of one site within one packing session.
///
/// Hindering causes form a multiset: a neighbor that hinders twice must release twice.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SiteStatus {
    #[default]
    Available,
    Occupied(AdsorbateId),
    Hindered(Vec<SiteId>),
}

impl SiteStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, SiteStatus::Available)
    }

    pub fn is_occupied(&self) -> bool {
        matches!(self, SiteStatus::Occupied(_))
    }

    pub fn is_hindered(&self) -> bool {
        matches!(self, SiteStatus::Hindered(_))
    }

    pub fn occupant(&self) -> Option<AdsorbateId> {
        match self {
            SiteStatus::Occupied(id) => Some(*id),
            _ => None,
        }
    }

    pub fn hindering_sites(&self) -> &[SiteId] {
        match self {
            SiteStatus::Hindered(causes) => causes,
            _ => &[],
        }
    }

    pub fn occupy(&mut self, adsorbate: AdsorbateId) -> Result<(), StatusError> {
        match self {
            SiteStatus::Available => {
                *self = SiteStatus::Occupied(adsorbate);
                Ok(())
            }
            SiteStatus::Occupied(current) => Err(StatusError::AlreadyOccupied(*current)),
            SiteStatus::Hindered(causes) => Err(StatusError::Hindered(causes.len())),
        }
    }

    /// Frees an occupied site and returns its former occupant.
    pub fn release(&mut self) -> Result<AdsorbateId, StatusError> {
        match *self {
            SiteStatus::Occupied(id) => {
                *self = SiteStatus::Available;
                Ok(id)
            }
            _ => Err(StatusError::NotOccupied),
        }
    }

    /// Records `cause` as a hindering neighbor. Occupied sites are unaffected.
    pub fn hinder(&mut self, cause: SiteId) {
        match self {
            SiteStatus::Available => *self = SiteStatus::Hindered(vec![cause]),
            SiteStatus::Hindered(causes) => causes.push(cause),
            SiteStatus::Occupied(_) => {}
        }
    }

    /// Drops one occurrence of `cause`. Occupied sites are unaffected.
    pub fn unhinder(&mut self, cause: SiteId) -> Result<(), StatusError> {
        match self {
            SiteStatus::Occupied(_) => Ok(()),
            SiteStatus::Available => Err(StatusError::NotHindered),
            SiteStatus::Hindered(causes) => {
                let index = causes
                    .iter()
                    .position(|&c| c == cause)
                    .ok_or(StatusError::UnknownCause(cause))?;
                causes.swap_remove(index);
                if causes.is_empty() {
                    *self = SiteStatus::Available;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn site_ids(n: usize) -> Vec<SiteId> {
        let mut map: SlotMap<SiteId, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    fn adsorbate_id() -> AdsorbateId {
        let mut map: SlotMap<AdsorbateId, ()> = SlotMap::with_key();
        map.insert(())
    }

    #[test]
    fn initial_state_is_available() {
        let status = SiteStatus::default();
        assert!(status.is_available());
        assert_eq!(status.occupant(), None);
        assert!(status.hindering_sites().is_empty());
    }

    #[test]
    fn occupy_and_release_round_trip() {
        let ads = adsorbate_id();
        let mut status = SiteStatus::Available;

        status.occupy(ads).unwrap();
        assert_eq!(status.occupant(), Some(ads));
        assert_eq!(status.occupy(ads), Err(StatusError::AlreadyOccupied(ads)));

        assert_eq!(status.release(), Ok(ads));
        assert!(status.is_available());
        assert_eq!(status.release(), Err(StatusError::NotOccupied));
    }

    #[test]
    fn hindrance_accumulates_until_every_cause_clears() {
        let causes = site_ids(2);
        let mut status = SiteStatus::Available;

        status.hinder(causes[0]);
        status.hinder(causes[1]);
        status.hinder(causes[0]);
        assert_eq!(status.hindering_sites().len(), 3);
        assert_eq!(status.occupy(adsorbate_id()), Err(StatusError::Hindered(3)));

        status.unhinder(causes[0]).unwrap();
        assert!(status.is_hindered());
        status.unhinder(causes[1]).unwrap();
        assert!(status.is_hindered());
        status.unhinder(causes[0]).unwrap();
        assert!(status.is_available());
    }

    #[test]
    fn occupied_is_sticky_against_hindrance() {
        let causes = site_ids(1);
        let ads = adsorbate_id();
        let mut status = SiteStatus::Occupied(ads);

        status.hinder(causes[0]);
        assert_eq!(status, SiteStatus::Occupied(ads));
        status.unhinder(causes[0]).unwrap();
        assert_eq!(status, SiteStatus::Occupied(ads));
    }

    #[test]
    fn invalid_unhinder_requests_are_errors() {
        let causes = site_ids(2);
        let mut status = SiteStatus::Available;
        assert_eq!(status.unhinder(causes[0]), Err(StatusError::NotHindered));

        status.hinder(causes[0]);
        assert_eq!(
            status.unhinder(causes[1]),
            Err(StatusError::UnknownCause(causes[1]))
        );
        assert_eq!(status.hindering_sites(), &[causes[0]]);
    }
}
