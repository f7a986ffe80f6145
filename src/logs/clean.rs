use regex::Regex;

/// Normalises raw log lines before they leave the machine.
pub struct LogCleaner {
    redact_secrets: bool,
    ansi: Regex,
    whitespace: Regex,
    bearer: Regex,
    api_key: Regex,
    email: Regex,
}

impl LogCleaner {
    pub fn new(redact_secrets: bool) -> Self {
        // The patterns are constants; failure here is a programming error.
        let compile = |pattern: &str| Regex::new(pattern).expect("log cleaner pattern");
        Self {
            redact_secrets,
            ansi: compile(r"\x1B\[[0-?]*[ -/]*[@-~]"),
            whitespace: compile(r"\s+"),
            bearer: compile(r"Bearer\s+\S+"),
            api_key: compile(r"api[_-]?key=\S+"),
            email: compile(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}"),
        }
    }

    /// Strips colour codes, collapses whitespace and, when enabled, masks
    /// bearer tokens, API keys and e-mail addresses.
    pub fn clean_line(&self, line: &str) -> String {
        let line = self.ansi.replace_all(line, "");
        let line = self.whitespace.replace_all(&line, " ");
        let line = line.trim();
        if !self.redact_secrets {
            return line.to_string();
        }
        let line = self.bearer.replace_all(line, "Bearer [REDACTED]");
        let line = self.api_key.replace_all(&line, "api_key=[REDACTED]");
        self.email.replace_all(&line, "[EMAIL]").into_owned()
    }

    /// Cleans every line and drops the ones left empty.
    pub fn clean_lines<'a, I>(&self, lines: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        lines
            .into_iter()
            .map(|line| self.clean_line(line))
            .filter(|line| !line.is_empty())
            .collect()
    }
}

impl Default for LogCleaner {
    fn default() -> Self {
        Self::new(true)
    }
}
