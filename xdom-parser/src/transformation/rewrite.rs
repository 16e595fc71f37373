use crate::{AttachmentReference, Block, DocumentReference, ResourceKind, ResourceReference, Xdom};

/// Make the document and attachment references of `xdom` absolute, as seen
/// from `base`, so they keep their target once the content is placed in
/// another document. URLs, mail addresses and same-page anchors are left
/// alone.
pub fn absolutize_references(xdom: &mut Xdom, base: &DocumentReference) {
    let ids: Vec<_> = xdom.descendants(xdom.root()).collect();
    for id in ids {
        if let Some(Block::Link { reference, .. } | Block::Image { reference, .. }) =
            xdom.block_mut(id)
        {
            absolutize(reference, base);
        }
    }
}

fn absolutize(reference: &mut ResourceReference, base: &DocumentReference) {
    if reference.reference.is_empty() || reference.reference.starts_with('#') {
        return;
    }
    match reference.kind {
        ResourceKind::Document => {
            reference.reference = DocumentReference::resolve(&reference.reference, base).to_string();
        }
        ResourceKind::Attachment => {
            reference.reference =
                AttachmentReference::resolve(&reference.reference, base).to_string();
        }
        ResourceKind::Url | ResourceKind::Mailto => {}
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::indexing_slicing)]
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(ResourceReference::new(ResourceKind::Document, "Page2"), "xwiki:Other.Page2")]
    #[case(ResourceReference::new(ResourceKind::Document, "Main.Home"), "xwiki:Main.Home")]
    #[case(ResourceReference::new(ResourceKind::Document, "wiki2:S.P"), "wiki2:S.P")]
    #[case(ResourceReference::new(ResourceKind::Attachment, "pic.png"), "xwiki:Other.Inc@pic.png")]
    #[case(ResourceReference::new(ResourceKind::Attachment, "A@f.txt"), "xwiki:Other.A@f.txt")]
    #[case(ResourceReference::new(ResourceKind::Url, "https://x.org/a"), "https://x.org/a")]
    #[case(ResourceReference::new(ResourceKind::Document, "#top"), "#top")]
    fn resolves_against_included_document(
        #[case] mut reference: ResourceReference,
        #[case] expected: &str,
    ) {
        absolutize(&mut reference, &DocumentReference::new("xwiki", "Other", "Inc"));
        assert_eq!(reference.reference, expected);
    }

    #[test]
    fn keeps_typed_flag() {
        let mut reference = ResourceReference::typed(ResourceKind::Document, "Page2");
        absolutize(&mut reference, &DocumentReference::new("xwiki", "Other", "Inc"));
        assert!(reference.typed);
        assert_eq!(reference.to_string(), "doc:xwiki:Other.Page2");
    }
}
