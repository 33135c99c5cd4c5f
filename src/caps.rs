//! Optional statistical capabilities, injected at construction.
//!
//! The extraction tiers that need external models (tokenization, word
//! embeddings, a trained category classifier) are expressed as nullable
//! collaborators rather than process-wide feature flags. An absent
//! capability silently removes exactly one fallback tier; the exact,
//! pattern, and phrase tiers never change behavior.

/// Token stream provider used by the normalizer's final re-join step.
pub trait Tokenizer: Send + Sync {
    /// Split `text` into tokens. An empty result leaves the text as-is.
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Word-vector provider for the embedding fallback tier.
pub trait WordEmbedder: Send + Sync {
    /// The vector for a single term, if the term is in vocabulary.
    fn vector(&self, term: &str) -> Option<Vec<f32>>;
}

/// Trained classifier for the category fallback tier.
pub trait CategoryClassifier: Send + Sync {
    /// Most probable category for `text` with its probability.
    fn classify(&self, text: &str) -> Option<(String, f64)>;
}

/// The set of optional collaborators available to the engine.
#[derive(Default)]
pub struct Capabilities {
    /// Optional tokenizer for normalization.
    pub tokenizer: Option<Box<dyn Tokenizer>>,
    /// Optional word-embedding model.
    pub embedder: Option<Box<dyn WordEmbedder>>,
    /// Optional trained category classifier.
    pub classifier: Option<Box<dyn CategoryClassifier>>,
}

impl Capabilities {
    /// No optional capabilities; exact/pattern/phrase tiers only.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Attach a tokenizer.
    #[must_use]
    pub fn with_tokenizer(mut self, tokenizer: Box<dyn Tokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    /// Attach a word-embedding model.
    #[must_use]
    pub fn with_embedder(mut self, embedder: Box<dyn WordEmbedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Attach a category classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Box<dyn CategoryClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities")
            .field("tokenizer", &self.tokenizer.is_some())
            .field("embedder", &self.embedder.is_some())
            .field("classifier", &self.classifier.is_some())
            .finish()
    }
}

/// Minimum cosine similarity for the embedding tier to accept a candidate.
pub const EMBEDDING_SIMILARITY_THRESHOLD: f64 = 0.7;

/// Minimum probability for the classifier tier to accept a prediction.
pub const CLASSIFIER_PROBABILITY_THRESHOLD: f64 = 0.6;

/// Mean vector over the in-vocabulary words of `words`.
pub(crate) fn centroid(embedder: &dyn WordEmbedder, words: &[&str]) -> Option<Vec<f32>> {
    let vectors: Vec<Vec<f32>> = words.iter().filter_map(|w| embedder.vector(w)).collect();
    let first = vectors.first()?;
    let dim = first.len();
    let mut mean = vec![0.0f32; dim];
    let mut count = 0usize;
    for v in &vectors {
        if v.len() != dim {
            continue;
        }
        for (m, x) in mean.iter_mut().zip(v) {
            *m += x;
        }
        count += 1;
    }
    if count == 0 {
        return None;
    }
    for m in &mut mean {
        *m /= count as f32;
    }
    Some(mean)
}

/// Cosine similarity of two vectors; 0.0 when either norm vanishes.
pub(crate) fn cosine(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut na = 0.0f64;
    let mut nb = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        dot += f64::from(*x) * f64::from(*y);
        na += f64::from(*x) * f64::from(*x);
        nb += f64::from(*y) * f64::from(*y);
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

/// Best candidate by centroid cosine similarity, gated by the threshold.
///
/// Used by the make/model/category embedding tiers: the text's token
/// centroid is compared against each candidate surface form.
pub(crate) fn best_by_similarity<'a>(
    embedder: &dyn WordEmbedder,
    text_words: &[&str],
    candidates: impl Iterator<Item = (&'a str, &'a str)>,
) -> Option<(&'a str, f64)> {
    let center = centroid(embedder, text_words)?;
    let mut best: Option<(&str, f64)> = None;
    for (term, value) in candidates {
        let Some(vec) = embedder.vector(term) else {
            continue;
        };
        let sim = cosine(&center, &vec);
        if sim > EMBEDDING_SIMILARITY_THRESHOLD
            && best.map_or(true, |(_, b)| sim > b)
        {
            best = Some((value, sim));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    pub(crate) struct FixedEmbedder(pub HashMap<String, Vec<f32>>);

    impl WordEmbedder for FixedEmbedder {
        fn vector(&self, term: &str) -> Option<Vec<f32>> {
            self.0.get(term).cloned()
        }
    }

    fn embedder() -> FixedEmbedder {
        let mut map = HashMap::new();
        map.insert("shock".to_string(), vec![1.0, 0.0]);
        map.insert("damper".to_string(), vec![0.9, 0.1]);
        map.insert("radiator".to_string(), vec![0.0, 1.0]);
        FixedEmbedder(map)
    }

    #[test]
    fn cosine_basics() {
        assert!((cosine(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-10);
        assert!(cosine(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-10);
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn centroid_skips_oov() {
        let e = embedder();
        let c = centroid(&e, &["shock", "missing"]).unwrap();
        assert_eq!(c, vec![1.0, 0.0]);
        assert!(centroid(&e, &["missing"]).is_none());
    }

    #[test]
    fn best_by_similarity_applies_threshold() {
        let e = embedder();
        let candidates = [("damper", "Shock Absorber"), ("radiator", "Radiator")];
        let (value, sim) =
            best_by_similarity(&e, &["shock"], candidates.iter().copied()).unwrap();
        assert_eq!(value, "Shock Absorber");
        assert!(sim > EMBEDDING_SIMILARITY_THRESHOLD);

        // Orthogonal vector stays below the threshold.
        let only_orthogonal = [("radiator", "Radiator")];
        assert!(best_by_similarity(&e, &["shock"], only_orthogonal.iter().copied()).is_none());
    }
}
