// Text preprocessing for the ML pipeline
// Lowercase word tokens, English stop words removed, Snowball stems, n-grams

use rust_stemmers::{Algorithm, Stemmer};

/// English stop words dropped before stemming
const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "etc",
    "few", "for", "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers",
    "herself", "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its",
    "itself", "just", "may", "me", "more", "most", "must", "my", "myself", "no", "nor", "not",
    "now", "of", "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves", "out",
    "over", "own", "same", "she", "should", "so", "some", "such", "than", "that", "the", "their",
    "theirs", "them", "themselves", "then", "there", "these", "they", "this", "those", "through",
    "to", "too", "under", "until", "up", "upon", "us", "very", "was", "we", "were", "what",
    "when", "where", "which", "while", "who", "whom", "why", "will", "with", "would", "you",
    "your", "yours", "yourself", "yourselves",
];

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Stemmed content words of `text`, in order
pub fn tokenize_and_stem(text: &str) -> Vec<String> {
    let stemmer = Stemmer::create(Algorithm::English);
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() > 1 && !is_stop_word(word))
        .map(|word| stemmer.stem(word).into_owned())
        .collect()
}

/// All n-grams with `min <= n <= max`, joined by a space
pub fn ngrams(tokens: &[String], (min, max): (usize, usize)) -> Vec<String> {
    let mut grams = Vec::new();
    for n in min.max(1)..=max {
        if n > tokens.len() {
            break;
        }
        grams.extend(tokens.windows(n).map(|window| window.join(" ")));
    }
    grams
}
