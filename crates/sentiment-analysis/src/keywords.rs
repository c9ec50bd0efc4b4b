//! French keyword lexicons and the financial keyword correction.

use serde::{Deserialize, Serialize};

pub const POSITIVE_KEYWORDS_FR: &[&str] = &[
    "croissance", "hausse", "profit", "bénéfice", "succès", "réussi",
    "nouveau contrat", "partenariat", "innovation", "expansion", "solide",
    "record", "amélioration", "robuste", "positif", "fort", "excellent",
    "performance", "leadership", "investit", "lancé", "modernise", "soutien",
    "perspectives positives", "résultats exceptionnels", "développement",
    "opportunité",
];

pub const NEGATIVE_KEYWORDS_FR: &[&str] = &[
    "perte", "baisse", "crise", "difficultés", "licenciement", "problème",
    "dette", "risque", "chute", "scandale", "défis", "confrontée",
    "inquiétudes", "pression", "prudence", "restructuration", "négatif",
    "échec", "recul", "menace", "tension", "faible",
];

pub const NEUTRAL_KEYWORDS_FR: &[&str] = &[
    "maintient", "stabilité", "prudente", "modérée", "observée", "contexte",
    "stratégie", "annonce", "prévue", "attendue",
];

// Financial terms, weighted 2 (strong) or 1 (moderate)
const STRONG_NEGATIVE: &[&str] = &[
    "dans le rouge", "chute", "effondrement", "krach", "pertes", "deficit",
    "faillite", "recession", "crise", "licenciements", "scandale", "fraude",
];
const MODERATE_NEGATIVE: &[&str] = &[
    "baisse", "recul", "repli", "ralentissement", "incertitude", "difficultes",
    "difficulte", "avertissement sur resultats", "avertissement",
];
const STRONG_POSITIVE: &[&str] = &[
    "dans le vert", "bond", "envolee", "benefice record", "acquisition", "fusion",
];
const MODERATE_POSITIVE: &[&str] = &[
    "hausse", "progression", "croissance", "amelioration", "rebond", "optimisme", "gain",
];

/// Score applied when the financial keywords override a label
pub const CORRECTED_SCORE: f64 = 0.7;

/// Lowercase, collapse whitespace and strip French diacritics.
pub fn normalize(text: &str) -> String {
    let lowered: String = text
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'à' | 'â' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'î' | 'ï' => 'i',
            'ô' | 'ö' => 'o',
            'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ÿ' => 'y',
            '’' => '\'',
            other => other,
        })
        .collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn count_matches(normalized: &str, keywords: &[&str]) -> usize {
    keywords
        .iter()
        .filter(|kw| normalized.contains(normalize(kw).as_str()))
        .count()
}

/// Lexicon score: `(pos - neg) / (pos + neg + neutral)`, 0 when nothing matches.
pub fn analyze_text(text: &str) -> f64 {
    let normalized = normalize(text);
    let pos = count_matches(&normalized, POSITIVE_KEYWORDS_FR) as f64;
    let neg = count_matches(&normalized, NEGATIVE_KEYWORDS_FR) as f64;
    let neutral = count_matches(&normalized, NEUTRAL_KEYWORDS_FR) as f64;

    let total = pos + neg + neutral;
    if total == 0.0 {
        return 0.0;
    }
    ((pos - neg) / total).clamp(-1.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadlineClass {
    Positive,
    Negative,
    Neutral,
}

impl HeadlineClass {
    pub fn from_score(score: f64) -> Self {
        if score > 0.2 {
            HeadlineClass::Positive
        } else if score < -0.2 {
            HeadlineClass::Negative
        } else {
            HeadlineClass::Neutral
        }
    }

    /// Short model label: POS, NEG or NEU
    pub fn label(&self) -> &'static str {
        match self {
            HeadlineClass::Positive => "POS",
            HeadlineClass::Negative => "NEG",
            HeadlineClass::Neutral => "NEU",
        }
    }
}

pub fn classify_headline(text: &str) -> HeadlineClass {
    HeadlineClass::from_score(analyze_text(text))
}

/// Map the label formats returned by classifiers to POS, NEG or NEU.
pub fn normalize_label(raw: &str) -> &'static str {
    let label = raw.trim().to_lowercase();
    if label.contains("neg") || matches!(label.as_str(), "label_0" | "0" | "1 star" | "2 stars") {
        "NEG"
    } else if label.contains("pos") || matches!(label.as_str(), "label_2" | "5 stars" | "4 stars") {
        "POS"
    } else {
        "NEU"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordBalance {
    pub pos_score: f64,
    pub neg_score: f64,
    pub matched: Vec<String>,
}

impl KeywordBalance {
    /// POS or NEG when one side leads by at least 1 point.
    pub fn suggested_label(&self) -> Option<&'static str> {
        if self.pos_score - self.neg_score >= 1.0 {
            Some("POS")
        } else if self.neg_score - self.pos_score >= 1.0 {
            Some("NEG")
        } else {
            None
        }
    }
}

pub fn financial_keywords(text: &str) -> KeywordBalance {
    let normalized = normalize(text);
    let mut balance = KeywordBalance::default();

    let groups: [(&[&str], f64, bool); 4] = [
        (STRONG_NEGATIVE, 2.0, false),
        (MODERATE_NEGATIVE, 1.0, false),
        (STRONG_POSITIVE, 2.0, true),
        (MODERATE_POSITIVE, 1.0, true),
    ];
    for (keywords, weight, positive) in groups {
        for kw in keywords.iter().filter(|kw| normalized.contains(**kw)) {
            if positive {
                balance.pos_score += weight;
            } else {
                balance.neg_score += weight;
            }
            balance.matched.push((*kw).to_string());
        }
    }
    balance
}

/// A single headline verdict, whichever method produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub label: String,
    pub score: f64,
    pub confidence: f64,
    pub correction_applied: bool,
}

impl Verdict {
    pub fn new(label: &str, score: f64, confidence: f64) -> Self {
        Self {
            label: normalize_label(label).to_string(),
            score: if score.is_finite() { score.clamp(-1.0, 1.0) } else { 0.0 },
            confidence: if confidence.is_finite() { confidence.clamp(0.0, 1.0) } else { 0.0 },
            correction_applied: false,
        }
    }
}

/// Override the label when the financial keywords clearly disagree with it.
pub fn correct_with_keywords(mut verdict: Verdict, text: &str) -> Verdict {
    if let Some(suggested) = financial_keywords(text).suggested_label() {
        if suggested != verdict.label {
            verdict.label = suggested.to_string();
            verdict.score = if suggested == "POS" { CORRECTED_SCORE } else { -CORRECTED_SCORE };
            verdict.confidence = verdict.confidence.max(0.7);
            verdict.correction_applied = true;
        }
    }
    verdict
}

/// Lexicon verdict with the financial correction applied.
pub fn keyword_verdict(text: &str, confidence: f64) -> Verdict {
    let score = analyze_text(text);
    let verdict = Verdict::new(HeadlineClass::from_score(score).label(), score, confidence);
    correct_with_keywords(verdict, text)
}
