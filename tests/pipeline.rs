use markdoc::{run_pipeline, Error, Manifest, NamespaceTree, RunConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixture_root() -> PathBuf {
    PathBuf::from(format!("{}/tests/fixtures/billing", env!("CARGO_MANIFEST_DIR")))
}

fn generate_with(root: &Path, methods: &[&str]) -> markdoc::Result<NamespaceTree> {
    let manifest = Manifest::load(&root.join("markdoc.toml"))?;
    let subjects = manifest.subjects()?;
    let config = RunConfig {
        root: manifest.root().to_path_buf(),
        methods: methods.iter().map(|m| m.to_string()).collect(),
        ..RunConfig::default()
    };
    run_pipeline(subjects, &config)
}

fn billing() -> NamespaceTree {
    generate_with(&fixture_root(), &[]).unwrap()
}

fn page<'t>(tree: &'t NamespaceTree, namespace: &str, leaf: &str) -> &'t str {
    &tree[namespace][leaf].text
}

/// A one-file project with the given Ruby source at `lib/<name>.rb`.
fn project(name: &str, source: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("lib")).unwrap();
    fs::write(dir.path().join(format!("lib/{}.rb", name)), source).unwrap();
    fs::write(
        dir.path().join("markdoc.toml"),
        "[discover]\ninclude = [\"lib/*.rb\"]\n",
    )
    .unwrap();
    dir
}

fn position(text: &str, needle: &str) -> usize {
    text.find(needle)
        .unwrap_or_else(|| panic!("`{}` not found in:\n{}", needle, text))
}

// -- entries --

#[test]
fn doc_block_prints_method_source() {
    let tree = billing();
    assert!(page(&tree, "Billing", "Invoice").contains("## A\nThis is 2\n"));
}

#[test]
fn eval_method_stubs_collaborators_and_constants() {
    let tree = billing();
    assert!(page(&tree, "Billing", "Invoice").contains("Total is 120"));
}

#[test]
fn inherited_members_render_in_the_descendant_context() {
    let tree = billing();
    let credit_note = page(&tree, "Billing", "CreditNote");
    assert!(credit_note.contains("## A\nThis is 2\n"));
    assert!(credit_note.contains("Total is 120"));
    assert!(credit_note.contains("## Reverse\n"));
}

#[test]
fn members_without_doc_blocks_are_left_out() {
    let tree = billing();
    let invoice = page(&tree, "Billing", "Invoice");
    assert!(!invoice.contains("## Subtotal"));
    assert!(!invoice.contains("## Undocumented"));
    assert!(!invoice.contains("no doc block here"));
}

#[test]
fn entries_follow_source_order_then_kind() {
    let tree = billing();
    let invoice = page(&tree, "Billing", "Invoice");
    let number = position(invoice, "## Number");
    let a = position(invoice, "## A\n");
    let total = position(invoice, "## Total");
    let build = position(invoice, "## Build");
    let values = position(invoice, "## Reference Values");
    assert!(number < a && a < total && total < build && build < values);
}

#[test]
fn constants_are_listed_as_reference_values() {
    let tree = billing();
    let invoice = page(&tree, "Billing", "Invoice");
    let values = &invoice[position(invoice, "## Reference Values")..];
    assert!(values.contains("\n20\n"));
    assert!(values.contains("\"hello\""));
}

// -- page layout --

#[test]
fn title_links_ancestors_and_summary_lists_descendants() {
    let tree = billing();
    assert!(page(&tree, "Billing", "Invoice").starts_with(
        "# Invoice < [Document](Billing::Document)\nDescendants: [Credit Note](Billing::CreditNote)\n"
    ));
    assert!(page(&tree, "Billing", "CreditNote")
        .starts_with("# Credit Note < [Invoice](Billing::Invoice) < [Document](Billing::Document)\n"));
}

#[test]
fn subjects_never_list_themselves() {
    let tree = billing();
    let document = page(&tree, "Billing", "Document");
    assert!(document.starts_with("# Document\nDescendants: "));
    assert!(document.contains("[Credit Note](Billing::CreditNote)"));
    assert!(document.contains("[Invoice](Billing::Invoice)"));
    assert!(!document.contains("[Document]"));
}

#[test]
fn subject_comment_follows_the_summary() {
    let tree = billing();
    let invoice = page(&tree, "Billing", "Invoice");
    assert!(position(invoice, "Descendants:") < position(invoice, "An invoice for a customer."));
    assert!(position(invoice, "An invoice for a customer.") < position(invoice, "## Number"));
}

#[test]
fn pages_end_with_one_blank_line() {
    let tree = billing();
    let invoice = page(&tree, "Billing", "Invoice");
    assert!(invoice.ends_with("\n\n"));
    assert!(!invoice.ends_with("\n\n\n"));
    assert!(!invoice.contains("\n\n\n"));
}

#[test]
fn undocumented_namespaces_have_empty_pages() {
    let tree = billing();
    assert!(tree[""]["Billing"].is_empty());
}

// -- links --

#[test]
fn same_page_markers_become_anchor_links() {
    let tree = billing();
    let invoice = page(&tree, "Billing", "Invoice");
    assert!(invoice.contains("using [A](#a)."));
    assert!(!invoice.contains("^`"));
}

#[test]
fn cross_page_markers_link_to_the_owner_page() {
    let tree = billing();
    assert!(page(&tree, "Billing", "CreditNote").contains("Reverses [Total](./billing-invoice#total)."));
}

// -- filters and failures --

#[test]
fn method_filter_limits_entries() {
    let tree = generate_with(&fixture_root(), &["Billing::Invoice#a"]).unwrap();
    let invoice = page(&tree, "Billing", "Invoice");
    assert!(invoice.contains("## A\nThis is 2\n"));
    assert!(!invoice.contains("## Total"));
    assert!(!invoice.contains("## Build"));
}

#[test]
fn method_filter_rejects_malformed_references() {
    let err = generate_with(&fixture_root(), &["Owner::Name"]).unwrap_err();
    assert!(matches!(err, Error::MalformedReference(ref raw) if raw == "Owner::Name"));
}

#[test]
fn template_errors_carry_the_doc_comment_location() {
    let dir = project(
        "broken",
        "class Broken\n  #=mark_doc\n  # <%= no_such_macro %>\n  #=mark_end\n  def oops\n  end\nend\n",
    );
    let err = generate_with(dir.path(), &[]).unwrap_err();
    assert!(matches!(err, Error::Template { .. }));
    let message = err.to_string();
    assert!(message.contains("undefined local variable or method `no_such_macro' for Broken"));
    assert!(message.contains("lib/broken.rb:"));
    assert!(message.contains("in `oops'"));
}

#[test]
fn malformed_references_inside_templates_are_fatal() {
    let dir = project(
        "owner",
        "class Owner\n  #=mark_doc\n  # <%= print_method_source(\"Owner::Name\") %>\n  #=mark_end\n  def name\n  end\nend\n",
    );
    let err = generate_with(dir.path(), &[]).unwrap_err();
    assert!(err
        .to_string()
        .starts_with("method_reference is formatted incorrectly: 'Owner::Name'"));
}

#[test]
fn blocks_without_an_end_marker_run_to_the_end_of_the_comment() {
    let dir = project(
        "open",
        "class Open\n  #=mark_doc\n  # Open ended.\n  def door\n  end\nend\n",
    );
    let tree = generate_with(dir.path(), &[]).unwrap();
    let open = page(&tree, "", "Open");
    assert!(open.contains("## Door\nOpen ended.\n"));
    assert!(open.contains("[//]: # (This method has no mark_end)"));
}
