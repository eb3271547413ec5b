//! Prompt Builder
//!
//! Consistent structure for every agent prompt: a role, numbered rules,
//! then input sections. Empty sections are left out entirely.

#[derive(Debug, Clone)]
enum PromptSection {
    Role { expertise: String, task: String },
    Rules(Vec<String>),
    Text { header: String, content: String },
    Code { header: String, language: String, content: String },
    Raw(String),
}

#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(mut self, expertise: &str, task: &str) -> Self {
        self.sections.push(PromptSection::Role {
            expertise: expertise.to_string(),
            task: task.to_string(),
        });
        self
    }

    pub fn rules(mut self, rules: &[&str]) -> Self {
        self.sections.push(PromptSection::Rules(
            rules.iter().map(|r| r.to_string()).collect(),
        ));
        self
    }

    /// Headed text section, skipped when `content` is blank
    pub fn section(mut self, header: &str, content: &str) -> Self {
        if !content.trim().is_empty() {
            self.sections.push(PromptSection::Text {
                header: header.to_string(),
                content: content.to_string(),
            });
        }
        self
    }

    /// Headed fenced code block, skipped when `content` is blank
    pub fn code(mut self, header: &str, language: &str, content: &str) -> Self {
        if !content.trim().is_empty() {
            self.sections.push(PromptSection::Code {
                header: header.to_string(),
                language: language.to_string(),
                content: content.to_string(),
            });
        }
        self
    }

    /// Preformatted block (e.g. user-provided context), skipped when absent
    pub fn raw(mut self, content: Option<&str>) -> Self {
        if let Some(c) = content.filter(|c| !c.trim().is_empty()) {
            self.sections.push(PromptSection::Raw(c.to_string()));
        }
        self
    }

    pub fn build(self) -> String {
        let mut prompt = String::new();

        for section in self.sections {
            match section {
                PromptSection::Role { expertise, task } => {
                    prompt.push_str(&format!("You are an expert {}. {}\n\n", expertise, task));
                }
                PromptSection::Rules(rules) => {
                    prompt.push_str("## Rules\n");
                    for (i, rule) in rules.iter().enumerate() {
                        prompt.push_str(&format!("{}. {}\n", i + 1, rule));
                    }
                    prompt.push('\n');
                }
                PromptSection::Text { header, content } => {
                    prompt.push_str(&format!("## {}\n{}\n\n", header, content.trim_end()));
                }
                PromptSection::Code {
                    header,
                    language,
                    content,
                } => {
                    prompt.push_str(&format!(
                        "## {}\n```{}\n{}\n```\n\n",
                        header,
                        language,
                        content.trim_end()
                    ));
                }
                PromptSection::Raw(content) => {
                    prompt.push_str(content.trim_end());
                    prompt.push_str("\n\n");
                }
            }
        }

        prompt.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_in_order() {
        let prompt = PromptBuilder::new()
            .role("DevOps engineer", "Classify the workflow.")
            .rules(&["Answer with JSON", "Be brief"])
            .section("Workflow path", ".github/workflows/deploy.yml")
            .code("Workflow content", "yaml", "on: push")
            .build();

        let role = prompt.find("DevOps").unwrap();
        let rules = prompt.find("1. Answer with JSON").unwrap();
        let code = prompt.find("```yaml\non: push\n```").unwrap();
        assert!(role < rules && rules < code);
        assert!(prompt.contains("2. Be brief"));
    }

    #[test]
    fn test_empty_sections_skipped() {
        let prompt = PromptBuilder::new()
            .section("README", "   ")
            .code("CI", "yaml", "")
            .raw(None)
            .raw(Some(""))
            .section("Path", "x")
            .build();
        assert_eq!(prompt, "## Path\nx");
    }
}
