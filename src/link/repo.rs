//! URLs for source locations and generated pages.

use crate::inflect;

/// Builds URLs for files in the documented repository.
pub trait RepositoryLinks: Send + Sync {
    /// URL of a file, `path` relative to the repository root.
    fn file_url(&self, path: &str) -> String;

    /// URL of one line of a file.
    fn method_url(&self, path: &str, line: usize) -> String {
        format!("{}#L{}", self.file_url(path), line)
    }

    /// Absolute URL of a subject's generated page. Links back to the page
    /// being rendered are later collapsed to plain anchors.
    fn page_url(&self, subject: &str) -> String;
}

/// `{base}/blob/{branch}/{path}` links.
#[derive(Debug, Clone)]
pub struct GitHubLinks {
    base_url: String,
    branch: String,
    output_dir: String,
}

impl GitHubLinks {
    pub fn new(base_url: &str, branch: &str, output_dir: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            branch: branch.to_string(),
            output_dir: output_dir.trim_matches('/').to_string(),
        }
    }
}

impl RepositoryLinks for GitHubLinks {
    fn file_url(&self, path: &str) -> String {
        format!(
            "{}/blob/{}/{}",
            self.base_url,
            self.branch,
            path.trim_start_matches("./")
        )
    }

    fn page_url(&self, subject: &str) -> String {
        self.file_url(&join(&self.output_dir, &inflect::page_path(subject)))
    }
}

/// Repository-relative paths, for projects without a hosted repository.
#[derive(Debug, Clone)]
pub struct LocalLinks {
    output_dir: String,
}

impl LocalLinks {
    pub fn new(output_dir: &str) -> Self {
        Self {
            output_dir: output_dir.trim_matches('/').to_string(),
        }
    }
}

impl RepositoryLinks for LocalLinks {
    fn file_url(&self, path: &str) -> String {
        path.trim_start_matches("./").to_string()
    }

    fn page_url(&self, subject: &str) -> String {
        join(&self.output_dir, &inflect::page_path(subject))
    }
}

fn join(dir: &str, path: &str) -> String {
    if dir.is_empty() || dir == "." {
        path.to_string()
    } else {
        format!("{}/{}", dir, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_urls() {
        let links = GitHubLinks::new("https://github.com/acme/widgets/", "master", "docs");
        assert_eq!(
            links.method_url("lib/billing/invoice.rb", 12),
            "https://github.com/acme/widgets/blob/master/lib/billing/invoice.rb#L12"
        );
        assert_eq!(
            links.page_url("Billing::Invoice"),
            "https://github.com/acme/widgets/blob/master/docs/billing/invoice.md"
        );
    }

    #[test]
    fn local_paths() {
        let links = LocalLinks::new(".");
        assert_eq!(links.method_url("./lib/a.rb", 3), "lib/a.rb#L3");
        assert_eq!(links.page_url("ReportParser::TransUnion"), "report_parser/trans_union.md");
    }
}
