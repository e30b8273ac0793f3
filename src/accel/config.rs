// This file is part of trackrec.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Recommender configuration.

use serde::{Deserialize, Serialize};

use crate::errors::{RecError, Result};

/// Which items may appear as neighbors (columns) of the similarity matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborScope {
    /// Every item in the universe is a candidate neighbor.
    #[default]
    AllItems,
    /// Only the target items are candidate neighbors.
    TargetItems,
}

/// Configuration for the k-NN recommender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KnnConfig {
    /// Shrinkage factor for significance weighting.
    pub shrinkage: f64,
    /// Number of neighbors kept per similarity row.
    pub k_filtering: usize,
    /// Number of target rows computed per similarity batch.
    pub chunk_size: usize,
    /// Candidate neighbor set.
    pub scope: NeighborScope,
    /// Weight of users stacked under the content matrix as pseudo-attributes.
    pub interaction_weight: Option<f64>,
}

impl Default for KnnConfig {
    fn default() -> Self {
        KnnConfig {
            shrinkage: 10.0,
            k_filtering: 200,
            chunk_size: 1000,
            scope: NeighborScope::AllItems,
            interaction_weight: None,
        }
    }
}

impl KnnConfig {
    /// Parse a configuration from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: KnnConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_shrinkage(mut self, shrinkage: f64) -> Self {
        self.shrinkage = shrinkage;
        self
    }

    pub fn with_neighbors(mut self, k: usize) -> Self {
        self.k_filtering = k;
        self
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn with_scope(mut self, scope: NeighborScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_interaction_weight(mut self, weight: Option<f64>) -> Self {
        self.interaction_weight = weight;
        self
    }

    /// Check that the configuration values are usable.
    pub fn validate(&self) -> Result<()> {
        if !self.shrinkage.is_finite() || self.shrinkage < 0.0 {
            return Err(RecError::InvalidConfig(format!(
                "shrinkage must be finite and non-negative, got {}",
                self.shrinkage
            )));
        }
        if self.k_filtering == 0 {
            return Err(RecError::InvalidConfig(
                "neighborhood size must be at least 1".into(),
            ));
        }
        if self.k_filtering > i32::MAX as usize {
            return Err(RecError::InvalidConfig(format!(
                "neighborhood size {} is too large",
                self.k_filtering
            )));
        }
        if self.chunk_size == 0 {
            return Err(RecError::InvalidConfig(
                "chunk size must be at least 1".into(),
            ));
        }
        if let Some(w) = self.interaction_weight {
            if !w.is_finite() || w < 0.0 {
                return Err(RecError::InvalidConfig(format!(
                    "interaction weight must be finite and non-negative, got {}",
                    w
                )));
            }
        }
        Ok(())
    }
}

#[test]
fn test_default_valid() {
    assert!(KnnConfig::default().validate().is_ok());
}

#[test]
fn test_from_json_partial() {
    let cfg = KnnConfig::from_json(r#"{"shrinkage": 130, "k_filtering": 95}"#).unwrap();
    assert_eq!(cfg.shrinkage, 130.0);
    assert_eq!(cfg.k_filtering, 95);
    assert_eq!(cfg.chunk_size, 1000);
    assert_eq!(cfg.scope, NeighborScope::AllItems);
}

#[test]
fn test_from_json_scope() {
    let cfg = KnnConfig::from_json(r#"{"scope": "target_items", "interaction_weight": 0.4}"#)
        .unwrap();
    assert_eq!(cfg.scope, NeighborScope::TargetItems);
    assert_eq!(cfg.interaction_weight, Some(0.4));
}

#[test]
fn test_from_json_unknown_field() {
    assert!(matches!(
        KnnConfig::from_json(r#"{"shrink": 3}"#),
        Err(RecError::Json(_))
    ));
}

#[test]
fn test_invalid_values() {
    let base = KnnConfig::default();
    assert!(base.clone().with_neighbors(0).validate().is_err());
    assert!(base.clone().with_shrinkage(-1.0).validate().is_err());
    assert!(base.clone().with_shrinkage(f64::NAN).validate().is_err());
    assert!(base.clone().with_chunk_size(0).validate().is_err());
    assert!(base
        .clone()
        .with_interaction_weight(Some(f64::INFINITY))
        .validate()
        .is_err());
    assert!(base.with_shrinkage(0.0).validate().is_ok());
}
