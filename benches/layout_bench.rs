use std::hint::black_box;
use std::time::Instant;

use galley::{Block, LayoutConfig, LayoutEngine};

const WORDS: &[&str] = &[
    "measure", "penalty", "chapter", "ragged", "margin", "spread", "glyph", "serif",
    "kerning", "ladder", "recto", "verso", "folio", "widow", "orphan", "gutter",
];

const FIXTURES: &[(&str, usize, usize)] = &[
    ("short-story", 1, 40),
    ("novella", 6, 120),
    ("novel", 24, 200),
];

fn synthetic_book(chapters: usize, paragraphs: usize) -> Vec<Block> {
    let mut blocks = Vec::with_capacity(chapters * (paragraphs + 1));
    for number in 1..=chapters {
        blocks.push(Block::Section {
            number,
            title: format!("Chapter {number}"),
        });
        for p in 0..paragraphs {
            let mut text = String::new();
            // Paragraph lengths cycle so line counts vary.
            let words = 30 + (p * 13) % 60;
            for w in 0..words {
                if w > 0 {
                    text.push(' ');
                }
                text.push_str(WORDS[(p + w) % WORDS.len()]);
            }
            blocks.push(Block::Paragraph { text });
        }
    }
    blocks
}

fn run_fixture(name: &str, chapters: usize, paragraphs: usize) {
    let blocks = synthetic_book(chapters, paragraphs);
    let engine = LayoutEngine::new(LayoutConfig::default());

    // Warm the measurement path once before timing.
    black_box(engine.layout_book(&blocks).expect("layout succeeds"));

    let started = Instant::now();
    let book = engine.layout_book(&blocks).expect("layout succeeds");
    let elapsed = started.elapsed();

    let paragraph_count = blocks
        .iter()
        .filter(|b| matches!(b, Block::Paragraph { .. }))
        .count();
    println!(
        "{name}: {} chapters, {} paragraphs -> {} pages in {:.1}ms",
        book.chapters.len(),
        paragraph_count,
        book.total_pages,
        elapsed.as_secs_f64() * 1000.0
    );
    black_box(book);
}

fn main() {
    for (name, chapters, paragraphs) in FIXTURES {
        run_fixture(name, *chapters, *paragraphs);
    }
}
