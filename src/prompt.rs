use crate::{
    config::Config,
    corpus::Corpus,
    error::{Error, Result},
};
use serde::Serialize;
use std::fs;
use tera::{Context, Tera};

const BUILTIN_TEMPLATE: &str = "readme";
const CUSTOM_TEMPLATE: &str = "custom";

const SYSTEM_INSTRUCTION: &str = "You are a technical writer. Study the sampled files of the \
    repository and return a complete README.md (raw markdown only).";
const MARKDOWN_INSTRUCTION: &str = "Use markdown to format your answers.";

#[derive(Serialize)]
struct PromptContext<'a> {
    corpus: &'a str,
    repo_url: &'a str,
    file_count: usize,
}

/// A fully rendered model input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    /// Role instruction sent as the system message
    pub system: String,
    /// Corpus wrapped in the instruction template
    pub user: String,
}

/// Renders the corpus into the README instruction template.
pub struct PromptBuilder {
    tera: Tera,
    template_name: &'static str,
    markdown: bool,
}

impl PromptBuilder {
    /// Creates a builder using the configured template.
    ///
    /// # Errors
    ///
    /// Returns an error if the external template cannot be read or compiled.
    pub fn new(config: &Config) -> Result<Self> {
        let mut tera = Tera::default();

        tera.add_raw_template(
            BUILTIN_TEMPLATE,
            include_str!("../templates/readme_prompt.tera"),
        )
        .map_err(|e| Error::template(BUILTIN_TEMPLATE, e.to_string()))?;

        let template_name = match config.template_path {
            Some(ref path) => {
                let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
                tera.add_raw_template(CUSTOM_TEMPLATE, &content)
                    .map_err(|e| Error::template(path.to_string_lossy(), e.to_string()))?;
                CUSTOM_TEMPLATE
            }
            None => BUILTIN_TEMPLATE,
        };

        Ok(Self {
            tera,
            template_name,
            markdown: config.model.markdown,
        })
    }

    /// Builds the system and user messages for one repository.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn build(&self, corpus: &Corpus, repo_url: &str) -> Result<Prompt> {
        let rendered = corpus.render();
        let context = PromptContext {
            corpus: &rendered,
            repo_url,
            file_count: corpus.len(),
        };

        let context = Context::from_serialize(&context)
            .map_err(|e| Error::template(self.template_name, e.to_string()))?;
        let user = self
            .tera
            .render(self.template_name, &context)
            .map_err(|e| Error::template(self.template_name, e.to_string()))?;

        let system = if self.markdown {
            format!("{SYSTEM_INSTRUCTION}\n{MARKDOWN_INSTRUCTION}")
        } else {
            SYSTEM_INSTRUCTION.to_string()
        };

        Ok(Prompt { system, user })
    }
}
