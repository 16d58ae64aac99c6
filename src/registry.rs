//! Static subject registry.
//!
//! Every subject is registered once at startup. Parent links are indexed so
//! descendant lookup does not need to scan the population.

use crate::error::{Error, Result};
use crate::model::{Constant, Member, Subject, SubjectKind};
use crate::reference::{ReferenceKind, Visibility};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A member together with the subject that declares it.
#[derive(Debug, Clone, Copy)]
pub struct PopulationEntry<'r> {
    pub member: &'r Member,
    pub owner: &'r Subject,
    pub visibility: Visibility,
}

#[derive(Debug, Default)]
pub struct SubjectRegistry {
    subjects: IndexMap<String, Subject>,
    children: HashMap<String, Vec<String>>,
}

impl SubjectRegistry {
    /// Build the registry. Duplicate names are a configuration error.
    pub fn new(subjects: impl IntoIterator<Item = Subject>) -> Result<Self> {
        let mut registry = Self::default();
        for subject in subjects {
            if registry.subjects.contains_key(&subject.name) {
                return Err(Error::config(format!(
                    "subject `{}` is registered twice",
                    subject.name
                )));
            }
            registry.subjects.insert(subject.name.clone(), subject);
        }

        let mut children: HashMap<String, Vec<String>> = HashMap::new();
        for subject in registry.subjects.values() {
            let Some(parent) = &subject.parent else {
                continue;
            };
            match registry.resolve(parent, &subject.name) {
                Ok(resolved) => children
                    .entry(resolved.name.clone())
                    .or_default()
                    .push(subject.name.clone()),
                Err(_) => debug!(subject = %subject.name, %parent, "parent is not a registered subject"),
            }
        }
        registry.children = children;
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subject> {
        self.subjects.values()
    }

    pub fn get(&self, name: &str) -> Option<&Subject> {
        self.subjects.get(name.trim_start_matches("::"))
    }

    /// Resolve `name` as written inside `context`: global lookup first, then
    /// `context::name`, then each enclosing namespace of `context`.
    pub fn resolve(&self, name: &str, context: &str) -> Result<&Subject> {
        if let Some(subject) = self.get(name) {
            return Ok(subject);
        }
        if !name.starts_with("::") {
            let mut scope = context;
            while !scope.is_empty() {
                if let Some(subject) = self.get(&format!("{}::{}", scope, name)) {
                    return Ok(subject);
                }
                scope = scope.rsplit_once("::").map_or("", |(outer, _)| outer);
            }
        }
        Err(Error::UnknownSubject {
            name: name.to_string(),
            context: context.to_string(),
        })
    }

    fn parent_of(&self, subject: &Subject) -> Option<&Subject> {
        let parent = subject.parent.as_deref()?;
        self.resolve(parent, &subject.name).ok()
    }

    /// Registered class ancestors, nearest first.
    pub fn ancestors(&self, name: &str) -> Vec<&Subject> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(name.to_string());
        let mut current = self.get(name);
        while let Some(parent) = current.and_then(|s| self.parent_of(s)) {
            if !seen.insert(parent.name.clone()) || parent.kind != SubjectKind::Class {
                break;
            }
            out.push(parent);
            current = Some(parent);
        }
        out
    }

    /// All registered subjects that inherit from `name`, sorted by name.
    pub fn descendants(&self, name: &str) -> Vec<&Subject> {
        let mut names = Vec::new();
        let mut stack = vec![name.to_string()];
        let mut seen: HashSet<String> = HashSet::new();
        while let Some(current) = stack.pop() {
            for child in self.children.get(&current).into_iter().flatten() {
                if child != name && seen.insert(child.clone()) {
                    names.push(child.clone());
                    stack.push(child.clone());
                }
            }
        }
        names.sort();
        names.iter().filter_map(|n| self.get(n)).collect()
    }

    /// The subject, its mixins, then every ancestor followed by its mixins.
    pub fn lineage(&self, name: &str) -> Vec<&Subject> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        if let Some(subject) = self.get(name) {
            self.push_with_mixins(subject, &mut out, &mut seen);
            for ancestor in self.ancestors(name) {
                self.push_with_mixins(ancestor, &mut out, &mut seen);
            }
        }
        out
    }

    fn push_with_mixins<'r>(
        &'r self,
        subject: &'r Subject,
        out: &mut Vec<&'r Subject>,
        seen: &mut HashSet<String>,
    ) {
        if !seen.insert(subject.name.clone()) {
            return;
        }
        out.push(subject);
        for include in &subject.includes {
            match self.resolve(include, &subject.name) {
                Ok(mixin) => self.push_with_mixins(mixin, out, seen),
                Err(_) => debug!(subject = %subject.name, mixin = %include, "mixin is not a registered subject"),
            }
        }
    }

    /// First declaration of a member along the lineage.
    pub fn find_member(&self, subject: &str, name: &str, kind: ReferenceKind) -> Option<(&Subject, &Member)> {
        self.lineage(subject)
            .into_iter()
            .find_map(|s| s.member(name, kind).map(|m| (s, m)))
    }

    /// Whether `name` is an instance member anywhere in the lineage.
    pub fn has_instance_member(&self, subject: &str, name: &str) -> bool {
        self.find_member(subject, name, ReferenceKind::Instance).is_some()
    }

    /// First constant named `name` along the lineage.
    pub fn find_constant(&self, subject: &str, name: &str) -> Option<(&Subject, &Constant)> {
        self.lineage(subject)
            .into_iter()
            .find_map(|s| s.constants.get(name).map(|c| (s, c)))
    }

    /// Constants visible on a subject, nearest declaration winning.
    pub fn constants(&self, subject: &str) -> Vec<(&Subject, &Constant)> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for owner in self.lineage(subject) {
            for constant in owner.constants.values() {
                if seen.insert(constant.name.as_str()) {
                    out.push((owner, constant));
                }
            }
        }
        out
    }

    /// Member population of a subject.
    ///
    /// Native members come first in declaration order, instance before
    /// class. Inherited members follow, gathered nearest-first and then
    /// reversed so root-most declarations lead. Overridden members appear
    /// once, under their nearest declaration.
    pub fn population(&self, name: &str) -> Vec<PopulationEntry<'_>> {
        let lineage = self.lineage(name);
        let Some((subject, inherited)) = lineage.split_first() else {
            return Vec::new();
        };
        let kinds = [ReferenceKind::Instance, ReferenceKind::Class];
        let mut out = Vec::new();
        let mut seen: HashSet<(ReferenceKind, &str)> = HashSet::new();

        for kind in kinds {
            for member in subject.members.iter().filter(|m| m.kind == kind) {
                if seen.insert((kind, member.name.as_str())) {
                    out.push(PopulationEntry {
                        member,
                        owner: subject,
                        visibility: Visibility::Native,
                    });
                }
            }
        }
        for kind in kinds {
            let mut tier = Vec::new();
            for owner in inherited {
                for member in owner.members.iter().filter(|m| m.kind == kind) {
                    if seen.insert((kind, member.name.as_str())) {
                        tier.push(PopulationEntry {
                            member,
                            owner,
                            visibility: Visibility::Super,
                        });
                    }
                }
            }
            tier.reverse();
            out.extend(tier);
        }
        out
    }
}
