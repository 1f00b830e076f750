//! Service manifest: the list of public methods with their documentation
//! and call shapes, plus the service's own name and description.

use serde::{Deserialize, Serialize};

use crate::registry::Registry;

/// Identity of a service as shown in its manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub description: Option<String>,
    pub url: Option<String>,
}

impl ServiceInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            url: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescription {
    pub name: String,
    pub description: String,
    pub args: Vec<String>,
    pub invocation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescription {
    pub methods: Vec<MethodDescription>,
    pub url: Option<String>,
    pub name: String,
    pub description: String,
}

/// Build the manifest for every public method of `registry`, sorted by name.
pub fn describe<C>(registry: &Registry<C>, info: &ServiceInfo) -> ServiceDescription {
    let methods = registry
        .list_public()
        .into_iter()
        .map(|(name, entry)| MethodDescription {
            name: name.to_string(),
            description: trim_doc(entry.doc().unwrap_or_default()),
            args: entry
                .signature()
                .arg_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
            invocation: format!("{}{}", name, entry.signature()),
        })
        .collect();

    ServiceDescription {
        methods,
        url: info.url.clone(),
        name: info.name.clone(),
        description: trim_doc(info.description.as_deref().unwrap_or_default()),
    }
}

fn expand_tabs(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut column = 0;
    for ch in line.chars() {
        if ch == '\t' {
            let pad = 8 - column % 8;
            out.extend(std::iter::repeat_n(' ', pad));
            column += pad;
        } else {
            out.push(ch);
            column += 1;
        }
    }
    out
}

/// Normalize documentation text for display.
///
/// Tabs become spaces (8-column stops), the common indentation of every
/// line after the first is removed, the first line is stripped, trailing
/// whitespace goes and leading/trailing blank lines are dropped.
pub fn trim_doc(doc: &str) -> String {
    if doc.is_empty() {
        return String::new();
    }
    let lines: Vec<String> = doc.lines().map(expand_tabs).collect();

    let indent = lines
        .iter()
        .skip(1)
        .filter_map(|line| {
            // Only ASCII blanks count as indentation so the offset stays a char boundary
            let stripped = line.trim_start_matches([' ', '\t']);
            (!stripped.is_empty()).then(|| line.len() - stripped.len())
        })
        .min();

    let mut trimmed: Vec<&str> = Vec::with_capacity(lines.len());
    if let Some(first) = lines.first() {
        trimmed.push(first.trim());
    }
    if let Some(indent) = indent {
        for line in lines.iter().skip(1) {
            trimmed.push(line.get(indent..).unwrap_or_default().trim_end());
        }
    }

    while trimmed.last().is_some_and(|line| line.is_empty()) {
        trimmed.pop();
    }
    let leading = trimmed.iter().take_while(|line| line.is_empty()).count();
    trimmed[leading..].join("\n")
}
