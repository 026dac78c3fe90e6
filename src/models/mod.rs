// Classifier models
// Lifecycle contract, registry and the built-in rules and ML implementations

pub mod contract;
pub mod keywords;
pub mod logistic;
pub mod logistic_regression;
pub mod pipeline;
pub mod registry;
pub mod rules;
pub mod text;
pub mod tfidf;

pub use contract::{Classifier, Metadata, Model, ModelArtifact, ModelKind, ModelState, Prediction};
pub use keywords::KeywordDictionary;
pub use logistic_regression::LogisticRegressionSubsampled;
pub use pipeline::HyperParams;
pub use registry::{ModelImplementation, ModelRegistry};
pub use rules::{KeywordDictionaryModel, KeywordRules, StarsSustainModel};
