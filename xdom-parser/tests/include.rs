#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::wildcard_enum_match_arm)]
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use pretty_assertions::assert_eq;
use rstest::rstest;
use xdom_parser::{
    AccessChecker, AllowAll, Block, DocumentLoader, DocumentReference, ERROR_CLASS,
    ExecutionContext, LoadError, LoadedDocument, MacroFailure, MacroRegistry, MacroTransformation,
    MemoryLoader, NodeId, Options, Parameters, ResourceKind, Syntax, Xdom, parse,
};

fn reference(text: &str) -> DocumentReference {
    text.parse().unwrap()
}

fn wiki(content: &str) -> LoadedDocument {
    LoadedDocument::new(content, Syntax::XWiki)
}

/// Words under `id`, spaces as single spaces.
fn text(xdom: &Xdom, id: NodeId) -> String {
    let mut text = String::new();
    for node in xdom.descendants(id) {
        match xdom.block(node) {
            Some(Block::Word(word)) => text.push_str(word),
            Some(Block::Space) => text.push(' '),
            Some(Block::NewLine) => text.push('\n'),
            _ => {}
        }
    }
    text
}

struct Counting {
    inner: MemoryLoader,
    loads: AtomicUsize,
}

impl DocumentLoader for Counting {
    fn load(&self, reference: &DocumentReference) -> Result<LoadedDocument, LoadError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load(reference)
    }
}

struct DenySecret;

impl AccessChecker for DenySecret {
    fn can_view(&self, _user: &str, reference: &DocumentReference) -> bool {
        reference.page() != "Secret"
    }
}

fn run_with(
    source: &str,
    loader: Arc<dyn DocumentLoader>,
    access: Arc<dyn AccessChecker>,
    options: Options,
    context: &mut ExecutionContext,
) -> (Xdom, Vec<MacroFailure>) {
    let mut xdom = parse(source, &options).unwrap();
    let failures = MacroTransformation::new(MacroRegistry::standard(loader, access), options)
        .transform(&mut xdom, context)
        .unwrap();
    (xdom, failures)
}

fn run(source: &str, loader: MemoryLoader) -> (Xdom, Vec<MacroFailure>) {
    let options = Options::builder().with_source(reference("Main.A")).build();
    run_with(
        source,
        Arc::new(loader),
        Arc::new(AllowAll),
        options,
        &mut ExecutionContext::new("XWiki.Alice"),
    )
}

#[test]
fn includes_content_under_macro_node() {
    let loader = MemoryLoader::new().with(reference("Main.B"), wiki("Hello **world**"));
    let (xdom, failures) = run("{{include document=\"B\"/}}", loader);
    assert!(failures.is_empty());
    let call = xdom.children(xdom.root())[0];
    assert!(matches!(
        xdom.block(call),
        Some(Block::Macro { executed: true, .. })
    ));
    assert_eq!(text(&xdom, call), "Hello world");
}

#[test]
fn reference_parameter_is_an_alias() {
    let loader = MemoryLoader::new().with(reference("Main.B"), wiki("aliased"));
    let (xdom, failures) = run("{{include reference=\"B\"/}}", loader);
    assert!(failures.is_empty());
    assert_eq!(text(&xdom, xdom.root()), "aliased");
}

#[test]
fn rewrites_relative_references_of_included_content() {
    let loader = MemoryLoader::new().with(
        reference("Other.B"),
        wiki("[[Page2]] [[image:pic.png]] [[https://example.org/x]]"),
    );
    let (xdom, failures) = run("{{include document=\"Other.B\"/}}", loader);
    assert!(failures.is_empty());
    let targets: Vec<(ResourceKind, String)> = xdom
        .descendants(xdom.root())
        .filter_map(|id| match xdom.block(id) {
            Some(Block::Link { reference, .. } | Block::Image { reference, .. }) => {
                Some((reference.kind, reference.reference.clone()))
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        targets,
        vec![
            (ResourceKind::Document, "xwiki:Other.Page2".to_string()),
            (ResourceKind::Attachment, "xwiki:Other.B@pic.png".to_string()),
            (ResourceKind::Url, "https://example.org/x".to_string()),
        ]
    );
}

#[test]
fn nested_includes_resolve_against_the_including_document() {
    let loader = MemoryLoader::new()
        .with(reference("Other.B"), wiki("{{include document=\"C\"/}}"))
        .with(reference("Other.C"), wiki("from c"));
    let (xdom, failures) = run("{{include document=\"Other.B\"/}}", loader);
    assert!(failures.is_empty());
    assert_eq!(text(&xdom, xdom.root()), "from c");
}

#[rstest]
#[case::missing_document(
    "{{include/}}",
    "Failed to execute the [include] macro. Cause: [You must specify a 'document' parameter pointing to the entity to include.]"
)]
#[case::self_inclusion(
    "{{include document=\"A\"/}}",
    "Failed to execute the [include] macro. Cause: [Found recursive inclusion of document [xwiki:Main.A]]"
)]
#[case::unknown_document(
    "{{include document=\"Missing\"/}}",
    "Failed to execute the [include] macro. Cause: [Failed to load document [xwiki:Main.Missing]: no such document]"
)]
#[case::bad_context(
    "{{include document=\"B\" context=\"shared\"/}}",
    "Failed to execute the [include] macro. Cause: [Invalid value [shared] for parameter [context]]"
)]
#[case::inline_call(
    "see {{include document=\"B\"/}}",
    "Failed to execute the [include] macro. Cause: [The [include] macro is a standalone macro and it cannot be used inline]"
)]
fn failures_are_reported_in_place(#[case] source: &str, #[case] message: &str) {
    let loader = MemoryLoader::new().with(reference("Main.B"), wiki("b"));
    let (xdom, failures) = run(source, loader);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].name, "include");
    assert_eq!(failures[0].message, message);
    assert_eq!(text(&xdom, failures[0].node), message);
}

#[test]
fn standalone_failure_is_an_error_group() {
    let (xdom, _) = run("{{include/}}", MemoryLoader::new());
    let call = xdom.children(xdom.root())[0];
    let group = xdom.children(call)[0];
    assert_eq!(
        xdom.block(group),
        Some(&Block::group(Parameters::new().with("class", ERROR_CLASS)))
    );
}

#[test]
fn indirect_recursion_keeps_the_rest_of_the_content() {
    let loader = MemoryLoader::new()
        .with(reference("Main.B"), wiki("before\n\n{{include document=\"A\"/}}"));
    let (xdom, failures) = run("{{include document=\"B\"/}}", loader);
    assert_eq!(failures.len(), 1);
    assert_eq!(
        failures[0].message,
        "Failed to execute the [include] macro. Cause: [Found recursive inclusion of document [xwiki:Main.A]]"
    );
    assert!(text(&xdom, xdom.root()).starts_with("before"));
}

#[rstest]
#[case::two_levels_current(&["B"], "current", 1)]
#[case::three_levels_current(&["B", "C"], "current", 2)]
#[case::two_levels_new(&["B"], "new", 1)]
#[case::three_levels_new(&["B", "C"], "new", 2)]
fn cycles_stop_before_loading_again(
    #[case] pages: &[&str],
    #[case] mode: &str,
    #[case] expected_loads: usize,
) {
    // Each page includes the next; the last one includes A again.
    let mut inner = MemoryLoader::new();
    for (index, page) in pages.iter().enumerate() {
        let next = pages.get(index + 1).copied().unwrap_or("A");
        inner = inner.with(
            reference(&format!("Main.{page}")),
            wiki(&format!("{page}\n\n{{{{include document=\"{next}\" context=\"{mode}\"/}}}}")),
        );
    }
    let loader = Arc::new(Counting {
        inner,
        loads: AtomicUsize::new(0),
    });
    let options = Options::builder().with_source(reference("Main.A")).build();
    let (xdom, failures) = run_with(
        &format!("{{{{include document=\"B\" context=\"{mode}\"/}}}}"),
        loader.clone(),
        Arc::new(AllowAll),
        options,
        &mut ExecutionContext::new("XWiki.Alice"),
    );
    assert_eq!(loader.loads.load(Ordering::SeqCst), expected_loads);
    assert_eq!(failures.len(), 1);
    assert_eq!(
        failures[0].message,
        "Failed to execute the [include] macro. Cause: [Found recursive inclusion of document [xwiki:Main.A]]"
    );
    let all = text(&xdom, xdom.root());
    assert!(pages.iter().all(|page| all.contains(page)));
}

#[test]
fn access_is_checked_before_loading() {
    let loader = Arc::new(Counting {
        inner: MemoryLoader::new().with(reference("Main.Secret"), wiki("classified")),
        loads: AtomicUsize::new(0),
    });
    let options = Options::builder().with_source(reference("Main.A")).build();
    let (xdom, failures) = run_with(
        "{{include document=\"Secret\"/}}",
        loader.clone(),
        Arc::new(DenySecret),
        options,
        &mut ExecutionContext::new("XWiki.Alice"),
    );
    assert_eq!(loader.loads.load(Ordering::SeqCst), 0);
    assert_eq!(
        failures[0].message,
        "Failed to execute the [include] macro. Cause: [Current user [XWiki.Alice] doesn't have view rights on document [xwiki:Main.Secret]]"
    );
    assert!(!text(&xdom, xdom.root()).contains("classified"));
}

#[test]
fn depth_limit_stops_long_chains() {
    let loader = MemoryLoader::new()
        .with(reference("Main.D1"), wiki("one\n\n{{include document=\"D2\"/}}"))
        .with(reference("Main.D2"), wiki("two\n\n{{include document=\"D3\"/}}"))
        .with(reference("Main.D3"), wiki("three"));
    let options = Options::builder()
        .with_source(reference("Main.A"))
        .with_max_include_depth(2)
        .build();
    let (xdom, failures) = run_with(
        "{{include document=\"D1\"/}}",
        Arc::new(loader),
        Arc::new(AllowAll),
        options,
        &mut ExecutionContext::new("XWiki.Alice"),
    );
    assert_eq!(failures.len(), 1);
    assert_eq!(
        failures[0].message,
        "Failed to execute the [include] macro. Cause: [Too many nested inclusions (2) while including document [xwiki:Main.D3]]"
    );
    let all = text(&xdom, xdom.root());
    assert!(all.contains("one") && all.contains("two"));
    assert!(!all.contains("three"));
}

const OUTER: &str = "{{set name=\"x\" value=\"outer\"/}}\n\n{{include document=\"B\" context=\"CONTEXT\"/}}\n\n{{get name=\"x\"/}}";
const INNER: &str = "{{set name=\"x\" value=\"inner\"/}}\n\n{{get name=\"x\"/}}";

#[rstest]
#[case::current("current", "inner", "inner")]
#[case::new("new", "inner", "outer")]
fn include_context_controls_shared_variables(
    #[case] mode: &str,
    #[case] included: &str,
    #[case] after: &str,
) {
    let loader = MemoryLoader::new().with(reference("Main.B"), wiki(INNER));
    let mut context = ExecutionContext::new("XWiki.Alice");
    let options = Options::builder().with_source(reference("Main.A")).build();
    let (xdom, failures) = run_with(
        &OUTER.replace("CONTEXT", mode),
        Arc::new(loader),
        Arc::new(AllowAll),
        options,
        &mut context,
    );
    assert!(failures.is_empty());
    let blocks = xdom.children(xdom.root());
    assert_eq!(text(&xdom, blocks[1]), included);
    assert_eq!(text(&xdom, blocks[2]), after);
    assert_eq!(context.variable("x"), Some(after));
}

#[test]
fn default_include_context_comes_from_options() {
    let loader = MemoryLoader::new().with(reference("Main.B"), wiki(INNER));
    let mut context = ExecutionContext::new("XWiki.Alice");
    let options = Options::builder()
        .with_source(reference("Main.A"))
        .with_default_include_context(xdom_parser::IncludeContext::New)
        .build();
    let (xdom, _) = run_with(
        &OUTER.replace(" context=\"CONTEXT\"", ""),
        Arc::new(loader),
        Arc::new(AllowAll),
        options,
        &mut context,
    );
    let blocks = xdom.children(xdom.root());
    assert_eq!(text(&xdom, blocks[2]), "outer");
}
