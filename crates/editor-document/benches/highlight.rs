use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use editor_document::{Document, DocumentContext, SearchFlags, TagId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn large_text(line_count: usize) -> String {
    let mut out = String::with_capacity(line_count * 64);
    for i in 0..line_count {
        out.push_str(&format!(
            "{i:06} the quick brown fox jumps over the lazy dog (editor-document benchmark)\n"
        ));
    }
    out.pop();
    out
}

fn highlighted(text: &str) -> Document {
    let mut doc = Document::from_text(&DocumentContext::local(), text);
    doc.set_search_text(Some("fox"), SearchFlags::ENTIRE_WORD);
    doc
}

fn bench_full_highlight(c: &mut Criterion) {
    let text = large_text(20_000);
    c.bench_function("highlight/full_reconcile_20k_lines", |b| {
        b.iter_batched(
            || highlighted(&text),
            |mut doc| {
                let len = doc.buffer().len_chars();
                doc.reconcile_highlight(0..len);
                black_box(doc.buffer().tags().ranges(TagId::FOUND).len());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_random_edits_then_viewport(c: &mut Criterion) {
    let text = large_text(20_000);
    let mut doc = highlighted(&text);
    let len = doc.buffer().len_chars();
    doc.reconcile_highlight(0..len);

    let mut rng = StdRng::seed_from_u64(42);
    c.bench_function("highlight/100_random_edits_then_viewport", |b| {
        b.iter(|| {
            for _ in 0..100 {
                let len = doc.buffer().len_chars();
                let pos = rng.gen_range(0..len);
                if rng.gen_bool(0.5) {
                    doc.insert(pos, "fox ").unwrap();
                } else {
                    doc.delete(pos, (pos + 4).min(len)).unwrap();
                }
            }

            // A 60 line viewport in the middle of the file.
            let start = doc.buffer().line_to_char(10_000);
            let end = doc.buffer().line_to_char(10_060);
            doc.reconcile_highlight(start..end);
            black_box(doc.is_highlight_stale(start..end));
        })
    });
}

fn bench_replace_all(c: &mut Criterion) {
    let text = large_text(5_000);
    c.bench_function("replace_all/5k_lines", |b| {
        b.iter_batched(
            || highlighted(&text),
            |mut doc| {
                let count = doc
                    .replace_all(Some("lazy"), "sleepy", SearchFlags::ENTIRE_WORD)
                    .unwrap();
                black_box(count);
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(
    benches,
    bench_full_highlight,
    bench_random_edits_then_viewport,
    bench_replace_all
);
criterion_main!(benches);
