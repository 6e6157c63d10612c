use galley::{Block, LayoutConfig, LayoutEngine};
use galley_render::{DrawCommand, PageComposer, RenderPage};

const FILLER: &[&str] = &[
    "long", "evening", "light", "fell", "across", "the", "printing", "floor", "where",
    "compositors", "locked", "type", "into", "formes", "for", "the", "morning", "run",
];

fn filler_paragraph(words: usize) -> String {
    let mut out = String::new();
    for i in 0..words {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(FILLER[i % FILLER.len()]);
    }
    out
}

fn sample_book() -> Vec<Block> {
    let mut blocks = Vec::new();
    for number in 1..=2 {
        blocks.push(Block::Section {
            number,
            title: format!("Part {number}"),
        });
        for _ in 0..10 {
            blocks.push(Block::Paragraph {
                text: filler_paragraph(70),
            });
        }
    }
    blocks
}

fn composed_pages() -> (LayoutConfig, Vec<RenderPage>) {
    let cfg = LayoutConfig::default();
    let engine = LayoutEngine::new(cfg.clone());
    let book = engine.layout_book(&sample_book()).unwrap();
    let pages = PageComposer::new(cfg.clone()).compose_book(&book);
    (cfg, pages)
}

#[test]
fn page_numbers_are_contiguous_from_one() {
    let (_, pages) = composed_pages();
    for (idx, page) in pages.iter().enumerate() {
        assert_eq!(page.page_number, idx + 1);
    }
    assert!(pages.len() >= 2);
}

#[test]
fn chapter_openings_center_the_number_line() {
    let (cfg, pages) = composed_pages();
    let opening = pages
        .iter()
        .find(|p| !p.metrics.is_blank)
        .expect("first content page");
    let heading = opening
        .commands
        .iter()
        .find_map(|cmd| match cmd {
            DrawCommand::Text(t) if t.runs.first().is_some_and(|r| r.text == "·1·") => Some(t),
            _ => None,
        })
        .expect("chapter number line on the opening page");
    assert_eq!(heading.alignment, galley::TextAlignment::Centered);
    let expected_x = cfg.margins.inner_mm + cfg.textblock_width_mm() / 2.0;
    assert!((heading.x_mm - expected_x).abs() < 0.01);
}

#[test]
fn interior_paragraph_lines_justify_and_last_lines_do_not() {
    let (_, pages) = composed_pages();
    let has_justified = pages
        .iter()
        .flat_map(|p| p.commands.iter())
        .any(|cmd| matches!(cmd, DrawCommand::JustifiedText(_)));
    assert!(has_justified, "long paragraphs must justify interior lines");
    for page in &pages {
        for cmd in &page.commands {
            if let DrawCommand::JustifiedText(j) = cmd {
                assert!(j.width_mm > 0.0);
                assert!(j.word_runs.len() > 1, "justified lines carry their words");
            }
        }
    }
}

#[test]
fn content_baselines_increase_down_the_page() {
    let (_, pages) = composed_pages();
    for page in pages.iter().filter(|p| !p.metrics.is_blank) {
        // The folio is appended last and sits in the head margin.
        let content = &page.commands[..page.commands.len() - 1];
        let mut previous = f32::MIN;
        for cmd in content {
            assert!(
                cmd.baseline_y_mm() >= previous,
                "page {}: baseline {} after {}",
                page.page_number,
                cmd.baseline_y_mm(),
                previous
            );
            previous = cmd.baseline_y_mm();
        }
    }
}

#[test]
fn folio_shows_the_page_number() {
    let (_, pages) = composed_pages();
    for page in pages.iter().filter(|p| !p.metrics.is_blank) {
        let folio = page.commands.last().expect("non-blank page has commands");
        assert_eq!(folio.text(), page.page_number.to_string());
    }
}

#[test]
fn blank_versos_precede_chapter_openings() {
    let (_, pages) = composed_pages();
    let mut chapter_openings = pages
        .iter()
        .filter(|p| !p.metrics.is_blank && p.metrics.chapter_page_index == 0);
    // Chapter one starts the book.
    assert_eq!(chapter_openings.next().map(|p| p.page_number), Some(1));
    for opening in chapter_openings {
        assert_eq!(opening.page_number % 2, 1);
        let preceding = &pages[opening.page_number - 2];
        assert!(preceding.metrics.is_blank || preceding.metrics.chapter_page_index > 0);
    }
}

#[test]
fn mirrored_margins_follow_page_parity() {
    let (cfg, pages) = composed_pages();
    for page in pages.iter().filter(|p| !p.metrics.is_blank) {
        let expected_left = if page.page_number % 2 == 1 {
            cfg.margins.inner_mm
        } else {
            cfg.margins.outer_mm
        };
        let min_x = page
            .commands
            .iter()
            .take(page.commands.len() - 1)
            .map(|cmd| match cmd {
                DrawCommand::Text(t) => t.x_mm,
                DrawCommand::JustifiedText(j) => j.x_mm,
            })
            .fold(f32::INFINITY, f32::min);
        if min_x.is_finite() {
            assert!(
                min_x >= expected_left - 0.01,
                "page {} starts at {} left of margin {}",
                page.page_number,
                min_x,
                expected_left
            );
        }
    }
}

#[test]
fn composed_pages_serialize() {
    let (_, pages) = composed_pages();
    let json = serde_json::to_string(&pages[0]).unwrap();
    let back: RenderPage = serde_json::from_str(&json).unwrap();
    assert_eq!(back, pages[0]);
}
