use crate::{ErrorCode, ErrorContext, RedashError};

impl From<reqwest::Error> for RedashError {
    fn from(err: reqwest::Error) -> Self {
        let code = if err.is_decode() || err.is_body() {
            ErrorCode::InvalidResponse
        } else if err.is_status() {
            ErrorCode::HttpStatus
        } else {
            ErrorCode::ConnectionFailed
        };

        let path = err
            .url()
            .map(|u| u.path().to_string())
            .unwrap_or_default();

        RedashError::new(code, err.to_string()).with_context(ErrorContext::Transport {
            method: String::new(),
            path,
            status: err.status().map(|s| s.as_u16()),
        })
    }
}

impl From<serde_json::Error> for RedashError {
    fn from(err: serde_json::Error) -> Self {
        RedashError::new(ErrorCode::MalformedPayload, err.to_string())
    }
}

impl From<std::io::Error> for RedashError {
    fn from(err: std::io::Error) -> Self {
        RedashError::new(ErrorCode::Internal, err.to_string())
    }
}

/// Closest option within an edit distance of 3, used for "Did you mean" hints.
pub fn find_closest_match(target: &str, options: &[String]) -> Option<String> {
    let target = target.to_lowercase();
    let mut best_match: Option<&str> = None;
    let mut min_distance = usize::MAX;

    for option in options {
        let distance = levenshtein(&target, &option.to_lowercase());
        if distance < min_distance && distance <= 3 {
            min_distance = distance;
            best_match = Some(option.as_str());
        }
    }

    best_match.map(|s| s.to_string())
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
