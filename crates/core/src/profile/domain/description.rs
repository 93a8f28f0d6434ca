/// Marker opening the card section of a description.
const CARD_MARKER: &str = "CARD:";
/// Marker opening the free-text biography section.
const BIO_MARKER: &str = "BIO:";

/// Common English words carrying no signal about someone's role.
pub const STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
    "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
    "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
    "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
    "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
    "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by",
    "for", "with", "about", "against", "between", "into", "through", "during", "before",
    "after", "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over",
    "under", "again", "further", "then", "once", "here", "there", "when", "where", "why",
    "how", "all", "any", "both", "each", "few", "more", "most", "other", "some", "such", "no",
    "nor", "not", "only", "own", "same", "so", "than", "too", "very", "s", "t", "can",
    "will", "just", "don", "should", "now", "also",
];

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

/// Lower-cased words of `text`, split on anything that is not a letter,
/// digit or underscore.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// A staff description:
///
/// ```text
/// CARD:
/// <name>
/// <job title>, <office>
/// <location>
/// BIO:
/// <heading>
/// <paragraph>
///
/// <heading>
/// <paragraph>
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Description {
    pub name: String,
    pub job: String,
    pub office: String,
    /// `(heading, content)` per biography paragraph.
    pub bio: Vec<(String, String)>,
}

impl Description {
    /// Parses the card/bio layout. Returns `None` when either marker is
    /// missing.
    pub fn parse(text: &str) -> Option<Description> {
        let (_, after_card) = text.split_once(CARD_MARKER)?;
        let (card, bio) = after_card.split_once(BIO_MARKER)?;

        let mut lines = card.lines().map(str::trim).filter(|l| !l.is_empty());
        let name = lines.next().unwrap_or_default().to_string();
        let job = lines.next().unwrap_or_default().to_string();
        let office = lines.next().unwrap_or_default().to_string();

        let bio = bio
            .split("\n\n")
            .map(|p| p.trim_matches('\n'))
            .filter(|p| !p.trim().is_empty())
            .map(|p| match p.split_once('\n') {
                Some((heading, content)) => (heading.trim().to_string(), content.to_string()),
                None => (String::new(), p.to_string()),
            })
            .collect();

        Some(Description {
            name,
            job,
            office,
            bio,
        })
    }

    /// Words describing the person's role: the job title (the part of the
    /// job line before its comma) followed by every biography paragraph.
    /// Headings are left out.
    pub fn words(&self) -> Vec<String> {
        let mut words = match self.job.split_once(',') {
            Some((title, rest)) if !rest.contains(',') => tokenize(title),
            _ => Vec::new(),
        };
        for (_, content) in &self.bio {
            words.extend(tokenize(content));
        }
        words
    }
}
