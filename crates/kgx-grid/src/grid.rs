//! Per-model hyperparameter grids.
//!
//! The base grid lists every parameter any model takes; [`grid_for`] prunes
//! it to what one model actually reads, and [`expand`] enumerates the
//! cartesian product with keys in sorted order (last key varying fastest).

use std::collections::BTreeMap;

use crate::value::ParamValue;
use crate::GridError;

/// One training configuration: parameter name → value.
pub type Config = BTreeMap<String, ParamValue>;

/// Parameter name → candidate values.
pub type Grid = BTreeMap<String, Vec<ParamValue>>;

pub const TRAIN_COMMAND: &str = "pykg2vec-train";

pub const DEFAULT_MODELS: &[&str] = &[
    "TransE", "TransH", "TransM", "RotatE", "KG2E", "Rescal", "DistMult", "Complex", "SimplE",
    "TuckER", "ConvE", "ConvKB",
];

pub const DEFAULT_DATASETS: &[&str] = &["fb15k_237", "wn18_rr"];

/// Parameter name → trainer command-line flag.
const FLAGS: &[(&str, &str)] = &[
    ("batch_size", "b"),
    ("cmax", "cmax"),
    ("cmin", "cmin"),
    ("dataset", "ds"),
    ("device", "device"),
    ("ent_hidden_size", "km"),
    ("epochs", "l"),
    ("feature_map_dropout", "fmd"),
    ("hidden_dropout", "hdt"),
    ("hidden_size", "k"),
    ("hidden_size_1", "k2"),
    ("input_dropout", "idt"),
    ("l1_flag", "l1"),
    ("lambda", "lmda"),
    ("learning_rate", "lr"),
    ("margin", "mg"),
    ("model_name", "mn"),
    ("num_filters", "fnum"),
    ("rel_hidden_size", "kr"),
    ("sampling", "s"),
];

const CONVE_ONLY: &[&str] = &[
    "hidden_size_1",
    "input_dropout",
    "feature_map_dropout",
    "hidden_dropout",
];

pub fn flag_for(key: &str) -> Option<&'static str> {
    FLAGS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, flag)| *flag)
}

fn ints(values: &[i64]) -> Vec<ParamValue> {
    values.iter().copied().map(ParamValue::Int).collect()
}

fn floats(values: &[f64]) -> Vec<ParamValue> {
    values.iter().copied().map(ParamValue::Float).collect()
}

/// The full search space before per-model pruning.
pub fn base_grid() -> Grid {
    let entries: Vec<(&str, Vec<ParamValue>)> = vec![
        ("hidden_size", ints(&[100, 500, 1_000])),
        ("hidden_size_1", ints(&[20])),
        ("batch_size", ints(&[100, 1_000, 10_000])),
        ("learning_rate", floats(&[1e-6, 1e-3, 0.1])),
        (
            "margin",
            vec![ParamValue::Float(0.1), ParamValue::Int(1), ParamValue::Int(10)],
        ),
        ("l1_flag", vec![ParamValue::Bool(true), ParamValue::Bool(false)]),
        ("cmin", floats(&[0.1, 0.3, 0.5])),
        ("cmax", ints(&[1, 3, 5])),
        ("device", vec![ParamValue::from("cuda")]),
        ("epochs", ints(&[500])),
        ("sampling", vec![ParamValue::from("bern")]),
        ("lambda", floats(&[0.001, 0.0001, 0.00001])),
        ("input_dropout", floats(&[0.1, 0.2])),
        ("feature_map_dropout", floats(&[0.1, 0.2])),
        ("hidden_dropout", floats(&[0.1, 0.2])),
        ("num_filters", ints(&[10, 50, 100])),
    ];
    entries
        .into_iter()
        .map(|(key, values)| (key.to_string(), values))
        .collect()
}

/// Prune `base` to the parameters `model` reads and pin model and dataset.
pub fn grid_for(base: &Grid, model: &str, dataset: &str) -> Grid {
    let mut grid = base.clone();
    grid.insert("model_name".to_string(), vec![ParamValue::from(model)]);
    grid.insert("dataset".to_string(), vec![ParamValue::from(dataset)]);

    // Only the translational models distinguish L1 from L2 distance.
    if !model.contains("Trans") {
        grid.remove("l1_flag");
    }

    // TuckER sizes entity and relation embeddings independently.
    if model == "TuckER" {
        if let Some(sizes) = grid.remove("hidden_size") {
            grid.insert("ent_hidden_size".to_string(), sizes.clone());
            grid.insert("rel_hidden_size".to_string(), sizes);
        }
    }

    if model != "KG2E" {
        grid.remove("cmin");
        grid.remove("cmax");
    }

    if !matches!(model, "DistMult" | "Complex" | "SimplE") {
        grid.remove("lambda");
    }

    if model != "ConvKB" {
        grid.remove("num_filters");
    }

    if model != "ConvE" {
        for key in CONVE_ONLY {
            grid.remove(*key);
        }
    }

    grid
}

/// Cartesian product of the grid, keys in sorted order, last key fastest.
/// A parameter with no candidate values yields no configurations.
pub fn expand(grid: &Grid) -> Vec<Config> {
    let mut configs = vec![Config::new()];
    for (key, values) in grid {
        configs = configs
            .iter()
            .flat_map(|partial| {
                values.iter().map(move |value| {
                    let mut config = partial.clone();
                    config.insert(key.clone(), value.clone());
                    config
                })
            })
            .collect();
    }
    configs
}

pub fn configs_for(model: &str, dataset: &str) -> Vec<Config> {
    expand(&grid_for(&base_grid(), model, dataset))
}

/// `pykg2vec-train -<flag> <value> ...` in sorted key order.
pub fn command_for(config: &Config) -> Result<String, GridError> {
    let mut parts = vec![TRAIN_COMMAND.to_string()];
    for (key, value) in config {
        let flag = flag_for(key).ok_or_else(|| GridError::UnknownParameter(key.clone()))?;
        parts.push(format!("-{flag} {value}"));
    }
    Ok(parts.join(" "))
}
