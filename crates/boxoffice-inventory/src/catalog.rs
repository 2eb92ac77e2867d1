//! Read-only catalog supplied by the event/organizer domain.
//!
//! Ticket types, their price tiers, and seatmap snapshots are loaded once
//! and never mutated by this core.

use std::collections::HashMap;
use std::path::Path;

use boxoffice_types::{
    BoxofficeError, Result, SeatmapId, SeatmapSnapshot, TicketType, TicketTypeId,
};
use serde::{Deserialize, Serialize};

use crate::price_resolver::overlapping_tiers;

/// On-disk shape of a catalog export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    pub ticket_types: Vec<TicketType>,
    #[serde(default)]
    pub seatmaps: Vec<SeatmapSnapshot>,
}

/// Immutable lookup of ticket types and seatmap snapshots.
#[derive(Debug, Default)]
pub struct Catalog {
    ticket_types: HashMap<TicketTypeId, TicketType>,
    seatmaps: HashMap<SeatmapId, SeatmapSnapshot>,
}

impl Catalog {
    /// Build a catalog, validating cross references.
    ///
    /// # Errors
    /// Returns `Configuration` if a seated ticket type references a missing
    /// seatmap, or if IDs are duplicated.
    pub fn new(file: CatalogFile) -> Result<Self> {
        let mut seatmaps = HashMap::with_capacity(file.seatmaps.len());
        for map in file.seatmaps {
            let id = map.id;
            if seatmaps.insert(id, map).is_some() {
                return Err(BoxofficeError::Configuration(format!(
                    "duplicate seatmap {id}"
                )));
            }
        }

        let mut ticket_types = HashMap::with_capacity(file.ticket_types.len());
        for tt in file.ticket_types {
            if let Some(map) = tt.seatmap() {
                if !seatmaps.contains_key(&map) {
                    return Err(BoxofficeError::Configuration(format!(
                        "ticket type {} references unknown seatmap {map}",
                        tt.id
                    )));
                }
            }
            if let Some((a, b)) = overlapping_tiers(&tt).first() {
                tracing::warn!(
                    ticket_type = %tt.id,
                    first = %a,
                    second = %b,
                    "price tiers overlap; the later-starting tier will win"
                );
            }
            let id = tt.id;
            if ticket_types.insert(id, tt).is_some() {
                return Err(BoxofficeError::Configuration(format!(
                    "duplicate ticket type {id}"
                )));
            }
        }

        Ok(Self {
            ticket_types,
            seatmaps,
        })
    }

    /// Parse a JSON catalog export.
    ///
    /// # Errors
    /// Returns `Serialization` on malformed JSON, or any [`Catalog::new`] error.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::new(file)
    }

    /// Load a JSON catalog export from disk.
    ///
    /// # Errors
    /// Returns `Io` if the file can't be read, or any [`Catalog::from_json`] error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Look up a ticket type.
    ///
    /// # Errors
    /// Returns `TicketTypeNotFound` for unknown IDs.
    pub fn ticket_type(&self, id: TicketTypeId) -> Result<&TicketType> {
        self.ticket_types
            .get(&id)
            .ok_or(BoxofficeError::TicketTypeNotFound(id))
    }

    #[must_use]
    pub fn seatmap(&self, id: SeatmapId) -> Option<&SeatmapSnapshot> {
        self.seatmaps.get(&id)
    }

    pub fn ticket_types(&self) -> impl Iterator<Item = &TicketType> {
        self.ticket_types.values()
    }

    pub fn seatmaps(&self) -> impl Iterator<Item = &SeatmapSnapshot> {
        self.seatmaps.values()
    }
}
