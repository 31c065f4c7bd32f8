use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use richtext_commands::{EditorState, Keymap, Platform, Selection, commands};
use richtext_model::Node;
use richtext_model::testing::{Tagged, block, build_doc, schema};

const PARAGRAPHS: usize = 2_000;
const LINE: &str = "the quick brown fox jumps over the lazy dog";

fn large_doc(paragraphs: usize) -> Node {
    let children = (0..paragraphs)
        .map(|i| {
            let text = format!("{i:05} {LINE}");
            if i % 10 == 9 {
                block(
                    "blockquote",
                    None,
                    vec![block("paragraph", None, vec![Tagged::from(text.as_str())])],
                )
            } else {
                block("paragraph", None, vec![Tagged::from(text.as_str())])
            }
        })
        .collect();
    build_doc(children).node
}

/// Cursor positions at the start of random top-level paragraphs.
fn block_starts(doc: &Node, count: usize) -> Vec<usize> {
    let mut starts = Vec::with_capacity(doc.child_count());
    let mut pos = 0;
    for i in 0..doc.child_count() {
        let child = doc.child(i);
        if child.is_textblock() {
            starts.push(pos + 1);
        }
        pos += child.node_size();
    }
    let mut rng = StdRng::seed_from_u64(7);
    (0..count)
        .map(|_| starts[rng.gen_range(1..starts.len())])
        .collect()
}

fn bench_join_backward(c: &mut Criterion) {
    let doc = large_doc(PARAGRAPHS);
    let starts = block_starts(&doc, 64);
    c.bench_function("join_backward/2k_blocks", |b| {
        b.iter(|| {
            for &pos in &starts {
                let state = EditorState::with_selection(doc.clone(), Selection::cursor(pos));
                black_box(commands::join_backward(&state, None));
            }
        })
    });
}

fn bench_split_block(c: &mut Criterion) {
    let doc = large_doc(PARAGRAPHS);
    let starts = block_starts(&doc, 64);
    c.bench_function("split_block/2k_blocks", |b| {
        b.iter_batched(
            || EditorState::with_selection(doc.clone(), Selection::cursor(starts[0] + 10)),
            |mut state| {
                for _ in 0..32 {
                    if let Some(tr) = commands::split_block(&state, None) {
                        state = state.apply(tr);
                    }
                }
                black_box(state.doc().child_count());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_toggle_mark_everything(c: &mut Criterion) {
    let doc = large_doc(PARAGRAPHS);
    let em = schema().mark_type("em").unwrap();
    let toggle = commands::toggle_mark(&em, None);
    let state = EditorState::with_selection(doc.clone(), Selection::all(&doc));
    c.bench_function("toggle_mark/select_all", |b| {
        b.iter(|| black_box(toggle.run(&state, None)))
    });
}

fn bench_keymap_dispatch(c: &mut Criterion) {
    let doc = large_doc(200);
    let keymap = Keymap::base(Platform::current());
    let state = EditorState::with_selection(doc.clone(), Selection::cursor(12));
    let keys = ["Enter", "Backspace", "Delete", "Mod-Backspace", "Alt-ArrowUp", "F5"];
    c.bench_function("keymap/dispatch", |b| {
        b.iter(|| {
            for key in keys {
                black_box(keymap.handle(key, &state, None));
            }
        })
    });
}

criterion_group!(
    benches,
    bench_join_backward,
    bench_split_block,
    bench_toggle_mark_everything,
    bench_keymap_dispatch
);
criterion_main!(benches);
