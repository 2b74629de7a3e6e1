//! Change detection against the index snapshot
//!
//! A file is NEW when its path is not indexed and MODIFIED when either half
//! of its stored fingerprint differs from the live stat. Content identity is
//! the path: a file replaced between scans is just MODIFIED.

use crate::enumerator::DiscoveredFile;
use std::collections::{BTreeMap, HashMap};
use vuvur_core::Fingerprint;

/// A file that needs metadata extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub file: DiscoveredFile,
    /// Live fingerprint taken during classification
    pub fingerprint: Fingerprint,
}

/// Classification of one cycle's enumeration
#[derive(Debug, Default, Clone)]
pub struct ChangeSet {
    pub new: Vec<Candidate>,
    pub modified: Vec<Candidate>,
    pub unchanged: usize,
    /// Indexed paths absent from the enumeration
    pub deleted: Vec<String>,
}

impl ChangeSet {
    /// Number of files that need extraction
    pub fn pending(&self) -> usize {
        self.new.len() + self.modified.len()
    }

    /// True when the index already matches the disk
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }
}

/// Classifies enumerated files against the index
pub struct ChangeDetector<'a> {
    snapshot: &'a HashMap<String, Fingerprint>,
}

impl<'a> ChangeDetector<'a> {
    pub fn new(snapshot: &'a HashMap<String, Fingerprint>) -> Self {
        Self { snapshot }
    }

    /// Stat every discovered file and classify it
    ///
    /// Files that can no longer be stat'ed are skipped. They are not
    /// treated as deleted here: DELETED is computed from the enumeration,
    /// so a file that is really gone drops out on the next walk.
    pub fn detect(&self, discovered: BTreeMap<String, DiscoveredFile>) -> ChangeSet {
        let mut changes = ChangeSet {
            deleted: self
                .snapshot
                .keys()
                .filter(|path| !discovered.contains_key(*path))
                .cloned()
                .collect(),
            ..Default::default()
        };

        for (key, file) in discovered {
            let fingerprint = match std::fs::metadata(&file.path) {
                Ok(meta) => Fingerprint::from_metadata(&meta),
                Err(e) => {
                    tracing::debug!("Skipping {}: {}", key, e);
                    continue;
                }
            };

            match self.snapshot.get(&key) {
                None => changes.new.push(Candidate { file, fingerprint }),
                Some(stored) if *stored != fingerprint => {
                    changes.modified.push(Candidate { file, fingerprint });
                }
                Some(_) => changes.unchanged += 1,
            }
        }

        changes.deleted.sort();
        changes
    }
}
