//! `markdoc.toml` manifest: project settings plus the subject registry
//! (discovered from sources and/or declared explicitly).

use crate::error::{Error, Result};
use crate::extract::{CommentExtractor, END_TOKEN, START_TOKEN};
use crate::link::{GitHubLinks, LocalLinks, RepositoryLinks};
use crate::model::{Constant, Member, Subject, SubjectKind};
use crate::pipeline::DEFAULT_PARALLELISM;
use crate::reference::ReferenceKind;
use crate::source::discover::{self, SubjectOutline};
use crate::template::Value;
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_MANIFEST: &str = "markdoc.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub discover: DiscoverConfig,
    #[serde(default, rename = "subject")]
    pub subjects: Vec<SubjectConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    pub root: PathBuf,
    pub repository_url: Option<String>,
    pub branch: String,
    pub output_dir: String,
    pub parallelism: usize,
    pub start_token: String,
    pub end_token: String,
    pub source_links: bool,
    pub methods: Vec<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            repository_url: None,
            branch: "master".to_string(),
            output_dir: "docs".to_string(),
            parallelism: DEFAULT_PARALLELISM,
            start_token: START_TOKEN.to_string(),
            end_token: END_TOKEN.to_string(),
            source_links: false,
            methods: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoverConfig {
    /// Glob patterns relative to the project root.
    pub include: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubjectConfig {
    pub name: String,
    pub file: Option<String>,
    pub kind: Option<SubjectKind>,
    pub parent: Option<String>,
    pub includes: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub discover: bool,
    #[serde(default, rename = "member")]
    pub members: Vec<MemberConfig>,
    #[serde(default)]
    pub constants: IndexMap<String, Value>,
    #[serde(default)]
    pub bootstrap: IndexMap<String, Value>,
    #[serde(default)]
    pub stubs: IndexMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberConfig {
    pub name: String,
    pub kind: ReferenceKind,
    pub line: Option<usize>,
    pub returns: Option<Value>,
}

fn default_true() -> bool {
    true
}

impl Manifest {
    /// Read a manifest. A relative `project.root` is resolved against the
    /// manifest's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut manifest = Self::parse(&text)?;
        if manifest.project.root.is_relative() {
            let base = path.parent().unwrap_or_else(|| Path::new(""));
            manifest.project.root = base.join(&manifest.project.root);
        }
        Ok(manifest)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let manifest: Manifest = toml::from_str(text)?;
        if manifest.project.parallelism == 0 {
            return Err(Error::config("parallelism must be at least 1"));
        }
        Ok(manifest)
    }

    pub fn root(&self) -> &Path {
        &self.project.root
    }

    pub fn output_dir(&self) -> PathBuf {
        self.project.root.join(&self.project.output_dir)
    }

    pub fn extractor(&self) -> Result<CommentExtractor> {
        CommentExtractor::new(&self.project.start_token, &self.project.end_token)
    }

    /// Blob links when a repository URL is configured, else local paths.
    pub fn links(&self) -> Box<dyn RepositoryLinks> {
        match &self.project.repository_url {
            Some(url) => Box::new(GitHubLinks::new(url, &self.project.branch, &self.project.output_dir)),
            None => Box::new(LocalLinks::new(&self.project.output_dir)),
        }
    }

    /// Discovered subjects in file order, with declared subjects merged
    /// over them and appended when new.
    pub fn subjects(&self) -> Result<Vec<Subject>> {
        let root = self.root();
        let mut subjects: IndexMap<String, Subject> = IndexMap::new();

        for file in self.discovered_files()? {
            for outline in read_outline(root, &file)?.subjects {
                merge_outline(&mut subjects, &file, outline);
            }
        }

        for declared in &self.subjects {
            if !subjects.contains_key(&declared.name) && declared.discover {
                if let Some(file) = &declared.file {
                    let outline = read_outline(root, file)?;
                    match outline.subject(&declared.name) {
                        Some(found) => merge_outline(&mut subjects, file, found.clone()),
                        None => debug!(subject = %declared.name, file, "subject not declared in its file"),
                    }
                }
            }
            let subject = subjects
                .entry(declared.name.clone())
                .or_insert_with(|| Subject::new(declared.name.clone()));
            apply(subject, declared);
        }

        Ok(subjects.into_values().collect())
    }

    /// Files matched by the discover globs, relative to the root, sorted and
    /// deduplicated.
    fn discovered_files(&self) -> Result<Vec<String>> {
        let root = self.root();
        let mut files = Vec::new();
        for pattern in &self.discover.include {
            let full = root.join(pattern);
            let entries = glob::glob(&full.to_string_lossy())
                .map_err(|err| Error::config(format!("invalid discover pattern `{}`: {}", pattern, err)))?;
            for entry in entries {
                let path = entry.map_err(|err| Error::config(format!("cannot scan `{}`: {}", pattern, err)))?;
                if !path.is_file() {
                    continue;
                }
                let relative = path.strip_prefix(root).unwrap_or(&path);
                files.push(relative.to_string_lossy().replace('\\', "/"));
            }
        }
        files.sort();
        files.dedup();
        Ok(files)
    }
}

fn read_outline(root: &Path, file: &str) -> Result<discover::Outline> {
    let path = root.join(file);
    let text = fs::read_to_string(&path).map_err(|source| Error::Read { path, source })?;
    Ok(discover::outline(&text))
}

/// Reopened subjects keep their first file and gain the new members.
fn merge_outline(subjects: &mut IndexMap<String, Subject>, file: &str, outline: SubjectOutline) {
    let subject = subjects.entry(outline.name.clone()).or_insert_with(|| {
        let mut subject = Subject::new(outline.name.clone());
        subject.kind = outline.kind;
        subject.file = Some(file.to_string());
        subject.line = Some(outline.line);
        subject
    });
    if subject.parent.is_none() {
        subject.parent = outline.parent;
    }
    for include in outline.includes {
        if !subject.includes.contains(&include) {
            subject.includes.push(include);
        }
    }
    let same_file = subject.file.as_deref() == Some(file);
    for member in outline.members {
        if subject.member(&member.name, member.kind).is_none() {
            // Lines are only meaningful in the subject's own file.
            let member = if same_file { member } else { Member::new(member.name, member.kind) };
            subject.members.push(member);
        }
    }
    for constant in outline.constants {
        subject.constants.entry(constant.name.clone()).or_insert(constant);
    }
}

fn apply(subject: &mut Subject, declared: &SubjectConfig) {
    if let Some(file) = &declared.file {
        if subject.file.as_deref() != Some(file.as_str()) {
            subject.file = Some(file.clone());
            subject.line = None;
        }
    }
    if let Some(kind) = declared.kind {
        subject.kind = kind;
    }
    if declared.parent.is_some() {
        subject.parent = declared.parent.clone();
    }
    if let Some(includes) = &declared.includes {
        subject.includes = includes.clone();
    }
    for member in &declared.members {
        if member.kind == ReferenceKind::Constant {
            let value = member.returns.clone().unwrap_or(Value::Nil);
            let line = member.line.or_else(|| subject.constants.get(&member.name).and_then(|c| c.line));
            subject.constants.insert(
                member.name.clone(),
                Constant {
                    name: member.name.clone(),
                    value,
                    line,
                },
            );
            continue;
        }
        subject.upsert_member(Member {
            name: member.name.clone(),
            kind: member.kind,
            line: member.line,
            returns: member.returns.clone(),
        });
    }
    for (name, value) in &declared.constants {
        let line = subject.constants.get(name).and_then(|c| c.line);
        subject.constants.insert(
            name.clone(),
            Constant {
                name: name.clone(),
                value: value.clone(),
                line,
            },
        );
    }
    subject.bootstrap.extend(declared.bootstrap.iter().map(|(k, v)| (k.clone(), v.clone())));
    subject.stubs.extend(declared.stubs.iter().map(|(k, v)| (k.clone(), v.clone())));
}
