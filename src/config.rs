//! Per-program settings. Every struct defaults to the constants the algorithms were tuned with and
//! can be overridden from a JSON file; fields missing from the file keep their default.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json;
use serde_json::Value;

use error::{MiningError, Phase, Result};

pub const MIN_SUPPORT: u32 = 100;
pub const ITEMS_TO_PRINT: usize = 20;
pub const MAX_RECOMMENDATIONS: usize = 10;
pub const MAX_ITERATIONS: usize = 20;

/// Which sub-pairs of a candidate triple must be frequent for it to be counted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TripleGate {
    /// At least one of the three sub-pairs is frequent.
    AnyPairFrequent,
    /// Textbook A-Priori, all three sub-pairs are frequent.
    AllPairsFrequent,
}

impl Default for TripleGate {
    fn default() -> Self {
        TripleGate::AnyPairFrequent
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AprioriConfig {
    /// Itemsets must be seen strictly more often than this to be frequent.
    pub min_support: u32,
    pub items_to_print: usize,
    pub triple_gate: TripleGate,
}

impl Default for AprioriConfig {
    fn default() -> Self {
        AprioriConfig {
            min_support: MIN_SUPPORT,
            items_to_print: ITEMS_TO_PRINT,
            triple_gate: TripleGate::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FriendsConfig {
    pub max_recommendations: usize,
}

impl Default for FriendsConfig {
    fn default() -> Self {
        FriendsConfig { max_recommendations: MAX_RECOMMENDATIONS }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KMeansConfig {
    /// Lloyd iterations to run, there is no early stopping.
    pub max_iterations: usize,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        KMeansConfig { max_iterations: MAX_ITERATIONS }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRankConfig {
    /// Power iterations, there is no early stopping.
    pub iterations: usize,
    /// Probability of jumping to a uniformly chosen page, which also ends a random walk.
    pub teleport_probability: f64,
    /// Number of random walks started from every page, one estimate per value.
    pub walks_per_node: Vec<usize>,
    /// Sizes of the top lists the estimates are compared on.
    pub top_k: Vec<usize>,
    /// Graph size, defaults to the largest page id in the input.
    pub num_pages: Option<usize>,
    pub seed: u32,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        PageRankConfig {
            iterations: 40,
            teleport_probability: 0.2,
            walks_per_node: vec![1, 3, 5],
            top_k: vec![10, 30, 50, 100],
            num_pages: None,
            seed: 42,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorsConfig {
    /// Number of latent factors per user and item.
    pub k: usize,
    /// Weight of the squared norms of the factors.
    pub lambda: f64,
    pub eta: f64,
    /// Passes over the ratings.
    pub iterations: usize,
    pub seed: u32,
}

impl Default for FactorsConfig {
    fn default() -> Self {
        FactorsConfig { k: 20, lambda: 0.2, eta: 0.03, iterations: 40, seed: 42 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimRankConfig {
    /// Decay applied to the similarity of neighbours.
    pub decay: f64,
    pub iterations: usize,
}

impl Default for SimRankConfig {
    fn default() -> Self {
        SimRankConfig { decay: 0.8, iterations: 3 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensestConfig {
    /// Nodes with an induced degree of at most `2 (1 + epsilon)` times the density are removed.
    pub epsilon: f64,
    /// Graph size, defaults to the largest node id in the input plus one.
    pub num_nodes: Option<usize>,
}

impl Default for DensestConfig {
    fn default() -> Self {
        DensestConfig { epsilon: 0.05, num_nodes: None }
    }
}

pub fn load_json<T: DeserializeOwned>(path: &str) -> Result<T> {
    let file = File::open(&Path::new(path)).map_err(|err| MiningError::io(Phase::Config, path, err))?;
    let config = serde_json::from_reader(file)?;
    Ok(config)
}

/// Like `load_json`, but fields missing from the file keep their value in `base` rather than the
/// `Default` of `T`.
pub fn load_json_onto<T: Serialize + DeserializeOwned>(path: &str, base: T) -> Result<T> {
    let file = File::open(&Path::new(path)).map_err(|err| MiningError::io(Phase::Config, path, err))?;
    overlay_json(file, base)
}

pub fn overlay_json<T, R>(reader: R, base: T) -> Result<T>
    where T: Serialize + DeserializeOwned, R: Read {

    let overrides: Value = serde_json::from_reader(reader)?;

    let overrides = match overrides {
        Value::Object(fields) => fields,
        other => return Err(MiningError::invalid_parameter("config",
            format!("expected a JSON object, found {}", other))),
    };

    let mut merged = serde_json::to_value(base)?;

    match merged {
        Value::Object(ref mut fields) => {
            for (name, value) in overrides {
                fields.insert(name, value);
            }
        },
        _ => return Err(MiningError::invalid_parameter("config",
            "settings must serialize to a JSON object")),
    }

    Ok(serde_json::from_value(merged)?)
}

#[cfg(test)]
mod tests {

    use serde_json;

    use config;
    use config::{AprioriConfig, KMeansConfig, TripleGate};
    use svm::SvmParameters;

    #[test]
    fn defaults() {
        let config = AprioriConfig::default();
        assert_eq!(config.min_support, 100);
        assert_eq!(config.items_to_print, 20);
        assert_eq!(config.triple_gate, TripleGate::AnyPairFrequent);
        assert_eq!(KMeansConfig::default().max_iterations, 20);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: AprioriConfig =
            serde_json::from_str(r#"{"min_support": 1, "triple_gate": "all-pairs-frequent"}"#)
                .unwrap();

        assert_eq!(config.min_support, 1);
        assert_eq!(config.items_to_print, 20);
        assert_eq!(config.triple_gate, TripleGate::AllPairsFrequent);
    }

    #[test]
    fn overlay_keeps_the_base_for_missing_fields() {
        let parameters = config::overlay_json(r#"{"c": 10}"#.as_bytes(), SvmParameters::batch())
            .unwrap();

        assert_eq!(parameters.c, 10);
        assert_eq!(parameters.eta, SvmParameters::batch().eta);
        assert_eq!(parameters.eps, SvmParameters::batch().eps);
        assert_eq!(parameters.batch_size, SvmParameters::batch().batch_size);
        assert_ne!(parameters.eta, SvmParameters::mini_batch().eta);

        assert!(config::overlay_json("[1, 2]".as_bytes(), SvmParameters::sgd()).is_err());
        assert!(config::overlay_json(r#"{"c": "ten"}"#.as_bytes(), SvmParameters::sgd()).is_err());
    }
}
