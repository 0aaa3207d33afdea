//! Keyword tables for intent and sentiment classification.
//!
//! Intent categories are scanned in declaration order and the first category
//! with any matching phrase wins, so the high-risk categories must stay at
//! the top of the table. Phrases are matched as case-insensitive substrings
//! of the utterance.

use saarthi_domain::model::IntentCategory;

/// Ordered intent keyword table (English + Hindi).
pub const INTENT_KEYWORDS: &[(IntentCategory, &[&str])] = &[
    (
        IntentCategory::EscalationRequest,
        &[
            "agent", "human", "person", "manager", "supervisor", "speak to someone",
            "real person", "customer care", "support", "help me", "transfer",
            "connect me", "talk to", "want human", "need human", "real human",
            "एजेंट", "इंसान", "मैनेजर", "सुपरवाइजर", "कस्टमर केयर",
            "ह्यूमन", "बात करवाओ", "बात कराओ", "किसी से बात", "असली इंसान",
            "सपोर्ट", "मदद करो", "हेल्प", "ट्रांसफर", "कनेक्ट करो",
            "कस्टमर सर्विस", "सर्विस", "किसी को बुलाओ", "मैनेजर से बात",
        ],
    ),
    (
        IntentCategory::FraudReport,
        &[
            "fraud", "scam", "cheat", "stolen", "hack", "unauthorized", "fake",
            "धोखा", "फ्रॉड", "चोरी", "हैक",
        ],
    ),
    (
        IntentCategory::Harassment,
        &[
            "harassment", "harass", "threaten", "abuse", "misbehave", "inappropriate",
            "उत्पीड़न", "धमकी", "गाली", "बदतमीजी",
        ],
    ),
    (
        IntentCategory::SafetyConcern,
        &[
            "accident", "emergency", "unsafe", "danger", "hurt", "injured", "police",
            "दुर्घटना", "इमरजेंसी", "खतरा", "पुलिस", "चोट",
        ],
    ),
    (
        IntentCategory::Complaint,
        &[
            "complaint", "complain", "problem", "issue", "wrong", "bad", "terrible",
            "शिकायत", "समस्या", "गलत", "खराब",
        ],
    ),
    (
        IntentCategory::PaymentIssue,
        &[
            "payment", "refund", "money", "charge", "deduct", "pay", "bill",
            "पेमेंट", "रिफंड", "पैसे", "चार्ज", "बिल",
        ],
    ),
    (
        IntentCategory::AccountIssue,
        &[
            "account", "login", "log in", "blocked", "suspended", "deactivated",
            "अकाउंट", "लॉगिन", "ब्लॉक",
        ],
    ),
    (
        IntentCategory::TripInquiry,
        &[
            "trip", "ride", "booking", "pickup", "drop location",
            "ट्रिप", "सवारी", "बुकिंग",
        ],
    ),
    (
        IntentCategory::FaqQuery,
        &[
            "how much", "price", "pricing", "cost", "plan details", "timings",
            "कितना", "कीमत", "प्लान",
        ],
    ),
    (
        IntentCategory::Greeting,
        &[
            "hello", "namaste", "good morning", "good evening", "hi there",
            "नमस्ते", "हेलो",
        ],
    ),
    (
        IntentCategory::Farewell,
        &[
            "goodbye", "bye bye", "see you", "talk to you later",
            "अलविदा", "फिर मिलेंगे",
        ],
    ),
    (
        IntentCategory::Confusion,
        &[
            "don't understand", "confused", "what", "how", "why", "explain",
            "समझ नहीं", "क्या", "कैसे", "क्यों",
        ],
    ),
    (
        IntentCategory::Appreciation,
        &[
            "thank", "thanks", "great", "helpful", "good", "nice", "appreciate",
            "धन्यवाद", "शुक्रिया", "अच्छा", "बढ़िया",
        ],
    ),
];

/// Keywords contributing to a negative sentiment score.
pub const NEGATIVE_KEYWORDS: &[&str] = &[
    "angry", "frustrated", "annoyed", "upset", "terrible", "worst", "hate",
    "pathetic", "useless", "stupid", "waste", "never", "disgusted", "bad",
    "गुस्सा", "परेशान", "बकवास", "बेकार", "घटिया", "नाराज़",
    "गुस्से", "निराशा", "खराब", "बुरा", "चिढ़", "तंग", "थक",
    "पागल", "बर्बाद", "झूठ", "धोखा", "फालतू",
];

/// Keywords contributing to a positive sentiment score.
pub const POSITIVE_KEYWORDS: &[&str] = &[
    "thank", "thanks", "great", "good", "nice", "helpful", "appreciate",
    "awesome", "excellent", "perfect", "love", "best",
    "धन्यवाद", "शुक्रिया", "अच्छा", "बढ़िया", "शानदार",
];
