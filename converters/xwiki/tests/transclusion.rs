#![allow(clippy::unwrap_used)]
use std::sync::Arc;

use pretty_assertions::assert_eq;
use rstest::rstest;
use xdom_converters_core::{Converter, Options};
use xdom_converters_xwiki::Processor;
use xdom_parser::{
    AllowAll, DocumentReference, ExecutionContext, LoadedDocument, MacroRegistry,
    MacroTransformation, MemoryLoader, Syntax, parse,
};

fn reference(text: &str) -> DocumentReference {
    text.parse().unwrap()
}

fn loader() -> MemoryLoader {
    MemoryLoader::new()
        .with(
            reference("Main.B"),
            LoadedDocument::new("Hello **world**", Syntax::XWiki),
        )
        .with(
            reference("Other.C"),
            LoadedDocument::new("See [[Page2]]", Syntax::XWiki),
        )
        .with(
            reference("Main.Notes"),
            LoadedDocument::new("first line\n* not a list", Syntax::Plain),
        )
}

/// Parse `source` as `Main.A`, run its macros and render the result.
fn transclude(source: &str, expand_macros: bool) -> String {
    let options = xdom_parser::Options::builder()
        .with_source(reference("Main.A"))
        .build();
    let mut xdom = parse(source, &options).unwrap();
    MacroTransformation::new(
        MacroRegistry::standard(Arc::new(loader()), Arc::new(AllowAll)),
        options,
    )
    .transform(&mut xdom, &mut ExecutionContext::new("XWiki.Alice"))
    .unwrap();
    Processor::new(Options::builder().expand_macros(expand_macros).build())
        .convert_to_string(&xdom)
        .unwrap()
}

#[rstest]
#[case::include("before\n\n{{include document=\"B\"/}}")]
#[case::failed_include("{{include document=\"Missing\"/}}")]
#[case::inline_call("see {{include document=\"B\"/}}")]
#[tracing_test::traced_test]
fn unexpanded_calls_print_as_written(#[case] source: &str) {
    assert_eq!(transclude(source, false), source);
}

#[rstest]
#[case::include(
    "before\n\n{{include document=\"B\"/}}",
    "before\n\nHello **world**"
)]
#[case::rewritten_references(
    "{{include document=\"Other.C\"/}}",
    "See [[xwiki:Other.Page2]]"
)]
#[case::plain_text_document(
    "{{include document=\"Notes\"/}}",
    "first line\n~* not a list"
)]
#[case::standalone_failure(
    "{{include document=\"Missing\"/}}",
    "(% class=\"xwikirenderingerror\" %)\n(((\nFailed to execute the [include] macro. Cause: [Failed to load document [xwiki:Main.Missing]: no such document]\n)))"
)]
#[case::inline_failure(
    "see {{include document=\"B\"/}}",
    "see ##Failed to execute the [include] macro. Cause: [The [include] macro is a standalone macro and it cannot be used inline]##"
)]
#[tracing_test::traced_test]
fn expanded_calls_print_their_content(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(transclude(source, true), expected);
}

#[test]
fn expanded_output_reads_as_the_included_document() {
    let rendered = transclude("{{include document=\"B\"/}}", true);
    let reread = parse(&rendered, &xdom_parser::Options::default()).unwrap();
    let included = parse("Hello **world**", &xdom_parser::Options::default()).unwrap();
    assert_eq!(reread.tree(reread.root()), included.tree(included.root()));
}
