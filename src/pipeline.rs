//! Runs every subject through extraction, templating, assembly and linking
//! on a bounded worker pool, then folds the pages into a namespace tree.

use crate::error::{Error, Result};
use crate::extract::CommentExtractor;
use crate::invoke::{Invoker, SourceInvoker};
use crate::link::{LocalLinks, RepositoryLinks};
use crate::model::{namespace_tree, NamespaceTree, Page, Subject};
use crate::reference::{MethodReference, ParseOptions};
use crate::registry::SubjectRegistry;
use crate::render::{RenderOptions, SubjectRenderer};
use crate::sink::{NullSink, OutputSink};
use crate::source::{FileLocator, SourceLocator};
use crate::template::{MacroModule, MacroSet, TemplateEngine, Workspace};
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_PARALLELISM: usize = 2;

/// Options of [`run_pipeline`].
#[derive(Clone)]
pub struct RunConfig {
    /// Project root that source paths are relative to.
    pub root: PathBuf,
    /// Qualified references to document instead of the full population.
    pub methods: Vec<String>,
    pub parallelism: usize,
    pub macro_extensions: Vec<Arc<dyn MacroModule>>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            methods: Vec::new(),
            parallelism: DEFAULT_PARALLELISM,
            macro_extensions: Vec::new(),
        }
    }
}

/// Document `subjects` with sources read from `config.root` and return the
/// pages grouped by namespace. Nothing is written.
pub fn run_pipeline(subjects: Vec<Subject>, config: &RunConfig) -> Result<NamespaceTree> {
    let registry = SubjectRegistry::new(subjects)?;
    let mut generator = Generator::new(registry, FileLocator::new(&config.root))
        .parallelism(config.parallelism)
        .methods(&config.methods)?;
    for module in &config.macro_extensions {
        generator = generator.macro_module(module.as_ref());
    }
    generator.run(&NullSink)
}

/// Configured documentation run.
pub struct Generator {
    registry: SubjectRegistry,
    locator: Box<dyn SourceLocator>,
    links: Box<dyn RepositoryLinks>,
    invoker: Box<dyn Invoker>,
    macros: MacroSet,
    extractor: CommentExtractor,
    options: RenderOptions,
    parallelism: usize,
}

impl Generator {
    pub fn new(registry: SubjectRegistry, locator: impl SourceLocator + 'static) -> Self {
        Self {
            registry,
            locator: Box::new(locator),
            links: Box::new(LocalLinks::new("docs")),
            invoker: Box::new(SourceInvoker),
            macros: MacroSet::builtin(),
            extractor: CommentExtractor::default(),
            options: RenderOptions::default(),
            parallelism: DEFAULT_PARALLELISM,
        }
    }

    pub fn links(mut self, links: Box<dyn RepositoryLinks>) -> Self {
        self.links = links;
        self
    }

    pub fn invoker(mut self, invoker: impl Invoker + 'static) -> Self {
        self.invoker = Box::new(invoker);
        self
    }

    /// Merge extra macros over the current set.
    pub fn macro_module(mut self, module: &dyn MacroModule) -> Self {
        self.macros.register(module);
        self
    }

    pub fn extractor(mut self, extractor: CommentExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn source_links(mut self, enabled: bool) -> Self {
        self.options.source_links = enabled;
        self
    }

    /// Restrict the run to these references. Each must name its owner
    /// (`Owner#name`, `Owner.name`).
    pub fn methods<S: AsRef<str>>(mut self, methods: &[S]) -> Result<Self> {
        let mut parsed = Vec::with_capacity(methods.len());
        for text in methods {
            let reference = MethodReference::parse(text.as_ref(), "", ParseOptions::default())?;
            if reference.context_name().is_none() {
                return Err(Error::config(format!(
                    "method filter `{}` must name its owner",
                    reference
                )));
            }
            reference.context(&self.registry)?;
            parsed.push(reference);
        }
        self.options.methods = parsed;
        Ok(self)
    }

    pub fn registry(&self) -> &SubjectRegistry {
        &self.registry
    }

    fn workspace(&self) -> Workspace<'_> {
        Workspace {
            registry: &self.registry,
            locator: self.locator.as_ref(),
            links: self.links.as_ref(),
            invoker: self.invoker.as_ref(),
            macros: &self.macros,
            extractor: &self.extractor,
            engine: TemplateEngine::new(),
        }
    }

    /// Render every subject, hand each page to `sink` and return the pages
    /// grouped by namespace. The first fatal error aborts the run.
    pub fn run(&self, sink: &dyn OutputSink) -> Result<NamespaceTree> {
        let subjects: Vec<&Subject> = self.registry.iter().collect();
        let total = subjects.len();
        if total == 0 {
            debug!("no subjects registered");
            return Ok(NamespaceTree::new());
        }

        let renderer = SubjectRenderer::new(self.workspace(), &self.options);
        let done = AtomicUsize::new(0);
        let batch_size = total.div_ceil(self.parallelism);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.parallelism)
            .build()?;

        info!(subjects = total, workers = self.parallelism, "generating pages");
        let batches: Vec<Vec<Page>> = pool.install(|| {
            subjects
                .par_chunks(batch_size)
                .map(|batch| {
                    batch
                        .iter()
                        .map(|subject| {
                            let page = renderer.render(subject)?;
                            sink.write(&page.subject, &page.text)?;
                            let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
                            info!(subject = %subject.name, "{}/{}", finished, total);
                            Ok(page)
                        })
                        .collect::<Result<Vec<Page>>>()
                })
                .collect::<Result<Vec<_>>>()
        })?;

        Ok(namespace_tree(batches.into_iter().flatten()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_must_name_their_owner() {
        let registry = SubjectRegistry::new(vec![Subject::new("Test")]).unwrap();
        let generator = Generator::new(registry, FileLocator::new("."));
        let err = generator.methods(&["#total"]).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn malformed_filters_are_fatal() {
        let registry = SubjectRegistry::new(vec![Subject::new("Test")]).unwrap();
        let generator = Generator::new(registry, FileLocator::new("."));
        let err = generator.methods(&["Test::Name"]).err().unwrap();
        assert!(matches!(err, Error::MalformedReference(_)));
    }

    #[test]
    fn empty_registry_yields_empty_tree() {
        let registry = SubjectRegistry::new(Vec::new()).unwrap();
        let tree = Generator::new(registry, FileLocator::new(".")).run(&NullSink).unwrap();
        assert!(tree.is_empty());
    }
}
