#![no_main]

use std::sync::Arc;

use grove_syntax::{InputEdit, Language, Parser, Tree};
use libfuzzer_sys::fuzz_target;
use text_size::{TextRange, TextSize};

const MAX_SOURCE_BYTES: usize = 4096;

fn decode_source(bytes: &[u8]) -> String {
    let capped = &bytes[..bytes.len().min(MAX_SOURCE_BYTES)];
    String::from_utf8_lossy(capped).into_owned()
}

/// Rounds `offset` down to a character boundary of `source`.
fn boundary(source: &str, seed: u8) -> usize {
    if source.is_empty() {
        return 0;
    }
    let mut offset = usize::from(seed) * source.len() / 255;
    while !source.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

fn shape(tree: &Tree) -> Vec<(String, u32, u32, bool)> {
    tree.root_node()
        .preorder()
        .map(|node| {
            let range = node.byte_range();
            (
                node.kind().to_string(),
                u32::from(range.start()),
                u32::from(range.end()),
                node.is_missing(),
            )
        })
        .collect()
}

fn check(language: &Arc<Language>, old: &str, start: usize, end: usize, insert: &str) {
    let mut parser = Parser::with_language(Arc::clone(language));
    let Ok(old_tree) = parser.parse(old, None) else {
        return;
    };
    assert_eq!(old_tree.len(), TextSize::of(old));

    let range = TextRange::new(
        TextSize::try_from(start).unwrap(),
        TextSize::try_from(end).unwrap(),
    );
    let change = InputEdit::replace(old, range, insert);
    let mut new = old.to_string();
    new.replace_range(start..end, insert);

    let edited = old_tree.edit(&change);
    let incremental = parser.parse(&new, Some(&edited)).unwrap();
    let fresh = Parser::with_language(Arc::clone(language))
        .parse(&new, None)
        .unwrap();
    assert_eq!(incremental.len(), TextSize::of(new.as_str()));
    assert_eq!(shape(&incremental), shape(&fresh));
    assert_eq!(incremental.errors(), fresh.errors());
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }
    let language = if data[0] % 2 == 0 {
        grove_langs::sexp()
    } else {
        grove_langs::transparency()
    };
    let split = 4 + usize::from(data[1]) % (data.len() - 3);
    let source = decode_source(&data[4..split]);
    let insert = decode_source(&data[split..]);

    let a = boundary(&source, data[2]);
    let b = boundary(&source, data[3]);
    let (start, end) = if a <= b { (a, b) } else { (b, a) };
    check(&language, &source, start, end, &insert);
});
