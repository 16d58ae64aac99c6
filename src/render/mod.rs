//! Per-subject rendering: member entries, reference values, page layout and
//! the two link passes.

pub mod markdown;
pub mod summary;

pub use markdown::{PageAssembler, Section};
pub use summary::Summary;

use crate::error::Result;
use crate::inflect;
use crate::link::{InlineLinker, RelativeLinkCollapser};
use crate::model::{Entries, EntryKey, Page, RenderedEntry, Subject};
use crate::reference::{MethodReference, ReferenceKind, Visibility};
use crate::template::{MacroContext, Origin, Workspace};
use tracing::{debug, warn};

/// Lifecycle and reflection hooks that never carry documentation. A missing
/// source for these is dropped without a warning.
pub const IGNORE_METHODS: &[&str] = &[
    "initialize",
    "inherited",
    "included",
    "extended",
    "prepended",
    "method_added",
    "method_undefined",
    "alias_method",
    "append_features",
    "attr",
    "attr_accessor",
    "attr_reader",
    "attr_writer",
    "define_method",
    "extend_object",
    "method_removed",
    "module_function",
    "prepend_features",
    "private",
    "protected",
    "public",
    "refine",
    "remove_const",
    "remove_method",
    "undef_method",
    "using",
];

/// Prefix of links to other pages.
pub const ROOT_PATH: &str = "./";

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Append a source link to every member entry.
    pub source_links: bool,
    /// Document only these members. Empty means the full population.
    pub methods: Vec<MethodReference>,
}

/// Renders subjects against a shared [`Workspace`].
pub struct SubjectRenderer<'w> {
    ws: Workspace<'w>,
    options: &'w RenderOptions,
}

impl<'w> SubjectRenderer<'w> {
    pub fn new(ws: Workspace<'w>, options: &'w RenderOptions) -> Self {
        Self { ws, options }
    }

    pub fn render(&self, subject: &'w Subject) -> Result<Page> {
        let mut entries = Entries::new();
        for reference in self.references(subject)? {
            match self.entry(&reference) {
                Ok(Some(entry)) => {
                    entries.insert(EntryKey::of(&reference), entry);
                }
                Ok(None) => {}
                Err(err) if err.is_recoverable() => {
                    if !IGNORE_METHODS.contains(&reference.name()) {
                        warn!(subject = %subject.name, %err, "skipping member");
                    }
                }
                Err(err) => return Err(err),
            }
        }
        entries.retain(|_, entry| !entry.is_blank());

        if self.options.source_links {
            self.append_source_links(&mut entries);
        }
        self.constant_entries(subject, &mut entries)?;
        let class_comment = self.class_comment(subject)?;

        let mut summary = Summary::new(self.ws, subject);
        let title = summary.title()?;
        let summary = summary.summary()?;

        let text = PageAssembler::new(&title, summary.as_deref())
            .class_comment(class_comment.as_deref())
            .assemble(&entries)?;
        let page_key = inflect::page_key(&subject.name);
        let text = InlineLinker::new(&page_key, ROOT_PATH).link(&text);
        let text = RelativeLinkCollapser::new(self.ws.links.page_url(&subject.name)).collapse(&text);

        Ok(Page {
            subject: subject.name.clone(),
            title,
            summary,
            entries,
            text,
        })
    }

    /// The method filter's references owned by `subject`, else the
    /// subject's member population.
    fn references(&self, subject: &Subject) -> Result<Vec<MethodReference>> {
        if !self.options.methods.is_empty() {
            let mut own = Vec::new();
            for reference in &self.options.methods {
                if reference.context(self.ws.registry)?.name == subject.name {
                    own.push(reference.clone());
                }
            }
            return Ok(own);
        }
        Ok(self
            .ws
            .registry
            .population(&subject.name)
            .into_iter()
            .map(|e| MethodReference::member(&subject.name, &e.member.name, e.member.kind, e.visibility))
            .collect())
    }

    /// Render one member's doc block. `None` when it has none.
    pub fn entry(&self, reference: &MethodReference) -> Result<Option<RenderedEntry>> {
        let registry = self.ws.registry;
        let owner = reference.context(registry)?;
        let site = self
            .ws
            .locator
            .locate(reference, owner, registry)
            .map_err(|err| err.into_error(reference))?;
        let block = self.ws.extractor.extract(&site);
        if block.is_empty() {
            debug!(%reference, "no doc block");
            return Ok(None);
        }

        let reference = reference.clone().at(Some(site.file.clone()), Some(site.line));
        let origin = Origin {
            file: site.file,
            line: block.line,
            member: reference.name().to_string(),
            reference: reference.raw().to_string(),
        };
        let mut ctx = MacroContext::new(self.ws, owner, Some(reference.clone()));
        let text = self.ws.engine.render(&block.text, &origin, &mut ctx)?;
        Ok(Some(RenderedEntry { text, reference }))
    }

    fn append_source_links(&self, entries: &mut Entries) {
        for entry in entries.values_mut() {
            let reference = &entry.reference;
            if reference.kind() == ReferenceKind::Constant {
                continue;
            }
            if let (Some(file), Some(line)) = (reference.file.as_deref(), reference.line) {
                let url = self.ws.links.method_url(file, line);
                entry.text = format!("{}\n\n[show on github]({})", entry.text, url);
            }
        }
    }

    /// Every constant visible on the subject, as a reference value entry:
    /// its own doc block, if any, followed by the presented value.
    fn constant_entries(&self, subject: &'w Subject, entries: &mut Entries) -> Result<()> {
        let registry = self.ws.registry;
        for (owner, constant) in registry.constants(&subject.name) {
            let visibility = if owner.name == subject.name {
                Visibility::Native
            } else {
                Visibility::Super
            };
            let reference = MethodReference::member(&subject.name, &constant.name, ReferenceKind::Constant, visibility);
            let value = constant.value.present();
            let text = match self.entry(&reference) {
                Ok(Some(doc)) if !doc.is_blank() => format!("{}\n{}", doc.text.trim_end(), value),
                Ok(_) => value,
                Err(err) if err.is_recoverable() => {
                    debug!(%reference, %err, "constant has no located source");
                    value
                }
                Err(err) => return Err(err),
            };
            entries.insert(EntryKey::of(&reference), RenderedEntry { text, reference });
        }
        Ok(())
    }

    /// The doc block above the subject's own declaration.
    fn class_comment(&self, subject: &'w Subject) -> Result<Option<String>> {
        let site = match self.ws.locator.locate_subject(subject) {
            Ok(site) => site,
            Err(err) => {
                debug!(subject = %subject.name, %err, "no subject comment");
                return Ok(None);
            }
        };
        let block = self.ws.extractor.extract(&site);
        if block.is_empty() {
            return Ok(None);
        }
        let origin = Origin {
            file: site.file,
            line: block.line,
            member: subject.leaf_name().to_string(),
            reference: subject.name.clone(),
        };
        let mut ctx = MacroContext::new(self.ws, subject, None);
        let text = self.ws.engine.render(&block.text, &origin, &mut ctx)?;
        Ok(Some(text.trim_end().to_string()).filter(|t| !t.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::CommentExtractor;
    use crate::invoke::SourceInvoker;
    use crate::link::LocalLinks;
    use crate::model::Member;
    use crate::registry::SubjectRegistry;
    use crate::source::{LocateError, SourceLocator, SourceSite};
    use crate::template::{MacroSet, TemplateEngine};

    /// Definitions keyed by member name: `(line, comment, body)`.
    struct Defs(Vec<(&'static str, usize, &'static str, &'static str)>);

    impl SourceLocator for Defs {
        fn locate(
            &self,
            reference: &MethodReference,
            _context: &Subject,
            _registry: &SubjectRegistry,
        ) -> std::result::Result<SourceSite, LocateError> {
            self.0
                .iter()
                .find(|(name, ..)| *name == reference.name())
                .map(|(_, line, comment, body)| SourceSite {
                    file: "lib/test.rb".to_string(),
                    line: *line,
                    comment: comment.to_string(),
                    comment_line: line - comment.lines().count(),
                    body: body.to_string(),
                })
                .ok_or_else(|| LocateError::NotFound(reference.to_string()))
        }

        fn locate_subject(&self, subject: &Subject) -> std::result::Result<SourceSite, LocateError> {
            Err(LocateError::NotFound(subject.name.clone()))
        }
    }

    struct Fixture {
        registry: SubjectRegistry,
        defs: Defs,
        links: LocalLinks,
        macros: MacroSet,
        extractor: CommentExtractor,
    }

    impl Fixture {
        fn new(defs: Defs) -> Self {
            let mut test = Subject::new("Test");
            for name in ["documented", "initialize", "missing"] {
                test.members.push(Member::new(name, ReferenceKind::Instance));
            }
            Self {
                registry: SubjectRegistry::new(vec![test]).unwrap(),
                defs,
                links: LocalLinks::new("docs"),
                macros: MacroSet::builtin(),
                extractor: CommentExtractor::default(),
            }
        }

        fn workspace(&self) -> Workspace<'_> {
            Workspace {
                registry: &self.registry,
                locator: &self.defs,
                links: &self.links,
                invoker: &SourceInvoker,
                macros: &self.macros,
                extractor: &self.extractor,
                engine: TemplateEngine::new(),
            }
        }

        fn render(&self, options: &RenderOptions) -> Result<Page> {
            let subject = self.registry.get("Test").unwrap();
            SubjectRenderer::new(self.workspace(), options).render(subject)
        }
    }

    fn documented() -> Defs {
        Defs(vec![(
            "documented",
            6,
            "=mark_doc\nHello from <%= __method__ %>\n=mark_end\n",
            "def documented\n  1\nend",
        )])
    }

    #[test]
    fn missing_sources_drop_only_that_entry() {
        let fixture = Fixture::new(documented());
        let page = fixture.render(&RenderOptions::default()).unwrap();
        let names: Vec<&str> = page.entries.keys().map(|key| key.name.as_str()).collect();
        assert_eq!(names, ["documented"]);
        assert_eq!(page.text, "# Test\n\n## Documented\nHello from Test#documented\n\n");
    }

    #[test]
    fn source_links_point_at_the_definition() {
        let fixture = Fixture::new(documented());
        let options = RenderOptions {
            source_links: true,
            ..RenderOptions::default()
        };
        let page = fixture.render(&options).unwrap();
        assert!(page
            .text
            .contains("Hello from Test#documented\n\n[show on github](lib/test.rb#L6)\n"));
    }

    #[test]
    fn method_filter_selects_entries() {
        let fixture = Fixture::new(documented());
        let options = RenderOptions {
            source_links: false,
            methods: vec![MethodReference::parse("Test#missing", "", Default::default()).unwrap()],
        };
        let page = fixture.render(&options).unwrap();
        assert!(page.entries.is_empty());
        assert!(page.is_empty());
    }

    #[test]
    fn entries_record_their_location() {
        let fixture = Fixture::new(documented());
        let subject = fixture.registry.get("Test").unwrap();
        let options = RenderOptions::default();
        let renderer = SubjectRenderer::new(fixture.workspace(), &options);
        let reference = MethodReference::member("Test", "documented", ReferenceKind::Instance, Visibility::Native);
        let entry = renderer.entry(&reference).unwrap().unwrap();
        assert_eq!(entry.reference.file.as_deref(), Some("lib/test.rb"));
        assert_eq!(entry.reference.line, Some(6));
        assert!(subject.member("documented", ReferenceKind::Instance).is_some());
    }
}
