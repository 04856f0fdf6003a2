use gauntlet_types::ModelFamily;

/// Weighted lexical indicators for one model family. Phrases are matched
/// case-insensitively as substrings of a response.
pub struct Signature {
    pub family: ModelFamily,
    pub indicators: &'static [(&'static str, f64)],
}

/// The fixed signature set. Weights reflect how family-specific a phrase is,
/// not how often it appears.
pub const SIGNATURES: &[Signature] = &[
    Signature {
        family: ModelFamily::Gpt,
        indicators: &[
            ("as an ai language model", 2.0),
            ("i don't have personal", 1.0),
            ("certainly!", 1.0),
            ("delve", 1.5),
            ("it's important to note", 1.0),
            ("i'm unable to", 0.5),
        ],
    },
    Signature {
        family: ModelFamily::Claude,
        indicators: &[
            ("i'd be happy to", 1.0),
            ("i appreciate", 1.0),
            ("it's worth noting", 1.0),
            ("i should be upfront", 1.5),
            ("i don't actually", 1.5),
            ("that said,", 0.5),
        ],
    },
    Signature {
        family: ModelFamily::Gemini,
        indicators: &[
            ("it is crucial to", 1.0),
            ("multifaceted", 1.5),
            ("in essence", 1.0),
            ("let's break down", 1.0),
            ("disclaimer:", 0.5),
        ],
    },
    Signature {
        family: ModelFamily::Llama,
        indicators: &[
            ("i cannot fulfill", 1.5),
            ("as a responsible ai", 1.5),
            ("i cannot provide", 1.0),
            ("i must emphasize", 1.0),
        ],
    },
    Signature {
        family: ModelFamily::Mistral,
        indicators: &[
            ("in short,", 1.0),
            ("to summarize", 0.5),
            ("straightforward", 1.0),
            ("concise", 1.0),
        ],
    },
    Signature {
        family: ModelFamily::Deepseek,
        indicators: &[
            ("let me think step by step", 1.5),
            ("okay, so", 1.0),
            ("wait,", 1.0),
            ("hmm,", 1.0),
        ],
    },
];

/// Map a free-form claimed model string to a family: case-insensitive and
/// substring-tolerant, so "gpt-4-turbo" and "gpt4o" both land on Gpt.
pub fn normalize_claimed_model(claimed: &str) -> ModelFamily {
    const ALIASES: &[(&str, ModelFamily)] = &[
        ("gpt", ModelFamily::Gpt),
        ("openai", ModelFamily::Gpt),
        ("davinci", ModelFamily::Gpt),
        ("claude", ModelFamily::Claude),
        ("anthropic", ModelFamily::Claude),
        ("opus", ModelFamily::Claude),
        ("sonnet", ModelFamily::Claude),
        ("haiku", ModelFamily::Claude),
        ("gemini", ModelFamily::Gemini),
        ("bard", ModelFamily::Gemini),
        ("palm", ModelFamily::Gemini),
        ("llama", ModelFamily::Llama),
        ("mixtral", ModelFamily::Mistral),
        ("mistral", ModelFamily::Mistral),
        ("deepseek", ModelFamily::Deepseek),
    ];

    let lowered = claimed.to_lowercase();
    ALIASES
        .iter()
        .find(|(alias, _)| lowered.contains(alias))
        .map(|(_, family)| *family)
        .unwrap_or(ModelFamily::Unknown)
}
