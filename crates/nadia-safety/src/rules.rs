/// One deterministic keyword rule. Matching adds `weight` to the risk score
/// and records `name` as a flag; `force_reject` rules override any
/// accumulated score and always recommend rejection, regardless of the
/// numeric risk.
pub struct SafetyRule {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    pub weight: f64,
    pub force_reject: bool,
}

/// Registry of explicit-rule triggers, ordered roughly by severity. These
/// are deliberately conservative keyword matches — a classifier stage could
/// sit alongside this list without changing the evaluator's contract.
pub fn default_rules() -> Vec<SafetyRule> {
    vec![
        SafetyRule {
            name: "self_harm",
            keywords: &["kill myself", "suicide", "self harm", "end my life"],
            weight: 1.0,
            force_reject: true,
        },
        SafetyRule {
            name: "minor_safety",
            keywords: &["i am 13", "i'm 13", "i am 14", "i'm 14", "i am 15", "i'm 15"],
            weight: 1.0,
            force_reject: true,
        },
        SafetyRule {
            name: "violence_threat",
            keywords: &["i will kill you", "i'll hurt you", "i'm going to hurt"],
            weight: 1.0,
            force_reject: true,
        },
        SafetyRule {
            name: "explicit_sexual_content",
            keywords: &["explicit sexual", "send nudes"],
            weight: 0.6,
            force_reject: false,
        },
        SafetyRule {
            name: "financial_request",
            keywords: &["send me money", "wire transfer", "gift card code"],
            weight: 0.5,
            force_reject: false,
        },
        SafetyRule {
            name: "personal_data_request",
            keywords: &["your home address", "your social security", "your credit card number"],
            weight: 0.5,
            force_reject: false,
        },
        SafetyRule {
            name: "off_platform_contact",
            keywords: &["add me on whatsapp", "text me at", "my phone number is"],
            weight: 0.2,
            force_reject: false,
        },
    ]
}
