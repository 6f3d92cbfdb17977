/*!
 * Preen, split and merge scenarios through the public API
 */

use anyhow::Result;

use tuforge::InterchangeDocument;
use tuforge::emit::{EmitOptions, Emitter};
use tuforge::export::Recombiner;
use tuforge::markup::{LenientHtmlProducer, TokenProducer};
use tuforge::segment::tags::{find_inline_tags, unmark};
use tuforge::segment::{BoundaryMode, Preener, Splitter, TagKind};
use tuforge::skeleton::{MergeOptions, SkeletonMerger};

fn import(source: &str) -> Result<(tuforge::emit::Emission, String)> {
    let tokens = LenientHtmlProducer::default().produce(source)?;
    let emission = Emitter::new(Splitter::default(), EmitOptions::default()).emit(&tokens);
    let merged = SkeletonMerger::new(&MergeOptions::default()).merge_str(&emission.skeleton, source);
    Ok((emission, merged.skeleton))
}

/// Import `source` and export it again with every unit untranslated
fn rebuild(source: &str) -> Result<String> {
    let (emission, skeleton) = import(source)?;
    let mut document = InterchangeDocument::new("fragment.html", "html", "utf-8", "en", "de");
    document.units = emission.units;
    let recombination = Recombiner::new(&document, &emission.formats).recombine(&skeleton);
    assert!(
        recombination.report.fallback_units.is_empty(),
        "{:?}: {:?}",
        source,
        recombination.report
    );
    Ok(recombination.text)
}

#[test]
fn test_preen_bracketing_pair_with_double_spaces() {
    let result = Preener::default().preen("  <bx rid='1'/>Hello<ex rid='1'/>  ", BoundaryMode::Sentence);
    assert_eq!(result.core, "Hello");
    assert_eq!(
        result.to_marked_string(),
        "  <bx rid='1'/><mrk mtype=\"x-coretext\">Hello</mrk><ex rid='1'/>  "
    );
}

#[test]
fn test_preen_singleton_with_spaces_should_not_become_a_unit() {
    let result = Preener::default().preen("<x id='1'/>   ", BoundaryMode::Sentence);
    assert!(!result.has_core());
    assert!(Splitter::default().split("<x id='1'/>   ", BoundaryMode::Sentence, "en").is_empty());
}

#[test]
fn test_preen_should_keep_begin_with_its_end_inside_core() {
    let text = "<bx id='1' rid='3'/>Click <bx id='2' rid='4'/>here<ex id='3' rid='4'/><ex id='4' rid='3'/> now.";
    let result = Preener::default().preen(text, BoundaryMode::Sentence);
    let core_tags = find_inline_tags(&result.core);
    for tag in core_tags.iter().filter(|tag| tag.kind == TagKind::Begin) {
        assert!(
            core_tags.iter().any(|other| other.kind == TagKind::End && other.rid == tag.rid),
            "Begin {:?} lost its End",
            tag.rid
        );
    }
    assert_eq!(unmark(&result.to_marked_string()), text);
}

#[test]
fn test_split_should_mark_pair_halves_outside_in_each_sentence() {
    let text = "Hello.<bx id='1' rid='5'/> <ex id='2' rid='5'/>World.";
    let segments = Splitter::default().split(text, BoundaryMode::Sentence, "en");
    assert_eq!(segments.len(), 2);
    assert!(segments[0].text.ends_with("</mrk><bx id='1' rid='5'/> "));
    assert!(segments[1].text.starts_with("<ex id='2' rid='5'/><mrk"));
    let rejoined: String = segments.iter().map(|segment| unmark(&segment.text)).collect();
    assert_eq!(rejoined, text);
}

#[test]
fn test_merge_should_not_delete_text_before_implied_paragraph_end() -> Result<()> {
    let (emission, skeleton) = import("<p>A<p>B</p>")?;
    assert_eq!(emission.units.len(), 2);
    assert_eq!(skeleton, "<p>%%%TU:1%%%<p>%%%TU:2%%%</p>");
    Ok(())
}

#[test]
fn test_merge_should_give_each_image_its_own_alt_unit() -> Result<()> {
    let (emission, skeleton) = import(r#"<p><img alt="x"><img alt="x"><img alt="x"></p>"#)?;
    assert_eq!(emission.units.len(), 3);
    let groups: Vec<u32> = emission.units.iter().map(|unit| unit.paragraph).collect();
    assert_eq!(groups, vec![1, 2, 3]);
    assert_eq!(
        skeleton,
        r#"<p><img alt="%%%TU:1%%%"><img alt="%%%TU:2%%%"><img alt="%%%TU:3%%%"></p>"#
    );
    Ok(())
}

#[test]
fn test_merge_should_account_for_every_source_byte() -> Result<()> {
    let source = "<div>\n  <p>One <b>two</b>. Three.</p>\n  <!-- note -->\n</div>\n";
    let (emission, skeleton) = import(source)?;

    let mut rebuilt = skeleton.clone();
    for found in tuforge::format::find_placeholders(&skeleton).into_iter().rev() {
        let replacement = match found.placeholder {
            tuforge::format::Placeholder::Tu(id) => emission
                .units
                .iter()
                .find(|unit| unit.id == id)
                .map(|unit| unmark(&unit.source))
                .unwrap_or_default(),
            tuforge::format::Placeholder::Format(id) => emission
                .formats
                .resolve(id)
                .unwrap_or_default(),
        };
        rebuilt.replace_range(found.start..found.end, &replacement);
    }
    let rebuilt = tuforge::segment::tags::strip_inline_tags(&rebuilt);
    assert_eq!(rebuilt, "<div>\n  <p>One two. Three.</p>\n  <!-- note -->\n</div>\n");
    Ok(())
}

#[test]
fn test_untranslated_export_should_rebuild_malformed_fragments() -> Result<()> {
    let cases = [
        // stray end tags
        "<p>Hello</b> world</p>",
        "<p>x</p></div>y",
        "<div></b>Text</div>",
        "<div>A</p>B</div>",
        // implied ends
        "<p>A<p>B</p>",
        "<ul><li>One<li>Two</ul>",
        "<table><tr><td>1<td>2</table>",
        // opaque content
        "<script>var s='</p><p>';</script><p>T</p>",
        "<style>p > a { color: red }</style><p>T</p>",
        "<p>Hi<![CDATA[x<p>]]>there</p>",
        "<div>x<![CDATA[</div>]]>y</div>",
        // mis-nesting
        "<b>x<p>y</b>z</p>",
        // comments
        "<p>a<!-- </p> -->b</p>",
        "<p>Text<!-- </p>",
        // attribute runs
        r#"<p><img alt="x"><img alt="x"><img alt="x"></p>"#,
        r#"<p><img alt="a"><!-- </p> --><img alt="b"></p>"#,
    ];
    for source in cases {
        assert_eq!(rebuild(source)?, source, "fragment {:?} was not rebuilt", source);
    }
    Ok(())
}
