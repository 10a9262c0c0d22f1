//! Ordered collection of extraction backends.
//!
//! Order is priority: when two backends support the same file, the one
//! registered first claims it and later backends never see it.

use crate::config::ExtractorConfig;
use crate::extractor::backend::Extractor;
use crate::extractor::command::CommandExtractor;
use std::time::Duration;

pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn Extractor>>,
}

impl ExtractorRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// Builds command backends from configuration, keeping their order.
    pub fn from_config(configs: &[ExtractorConfig], timeout: Option<Duration>) -> Self {
        let mut registry = Self::new();
        for config in configs {
            registry.register(CommandExtractor::from_config(config).with_timeout(timeout));
        }
        registry
    }

    /// Appends a backend with the lowest priority so far.
    pub fn register<E: Extractor + 'static>(&mut self, extractor: E) {
        self.extractors.push(Box::new(extractor));
    }

    pub fn with<E: Extractor + 'static>(mut self, extractor: E) -> Self {
        self.register(extractor);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Extractor> {
        self.extractors.iter().map(|e| e.as_ref())
    }

    pub fn get(&self, id: &str) -> Option<&dyn Extractor> {
        self.iter().find(|e| e.id() == id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.iter().map(|e| e.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
