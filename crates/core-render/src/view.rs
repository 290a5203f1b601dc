//! Full playground frame: step header, before/after rulers with tracked
//! pointers, mapping arrows and the narrative card.

use crate::ruler::Ruler;
use crate::{RenderOptions, Tone, paint};
use core_session::{PRIMARY_ID, SessionView, TrackedView, narrate};
use core_step::Step;

/// Gap range the step occupies in the post-edit document: the inserted
/// content for an insert, the collapse point for a delete.
pub fn after_range(step: &Step) -> (usize, usize) {
    match step {
        Step::Insert { from, .. } => (*from, from + step.inserted_len()),
        Step::Delete { from, .. } => (*from, *from),
    }
}

fn tone_of(t: &TrackedView, after: bool) -> Tone {
    if after && t.result.deleted {
        Tone::Deleted
    } else if t.id == PRIMARY_ID {
        Tone::Cursor
    } else {
        Tone::Extra
    }
}

fn block(
    out: &mut Vec<String>,
    title: &str,
    doc: &str,
    range: (usize, usize),
    view: &SessionView,
    after: bool,
    opts: &RenderOptions,
) {
    let ruler = Ruler::new(doc);
    out.push(paint(title, Tone::Title, opts));
    out.push(ruler.cells_line());
    out.push(ruler.index_line(Some(range), opts));
    out.push(ruler.range_line(range.0, range.1, opts));
    for t in view.tracked() {
        let (pos, suffix) = if after {
            let suffix = if t.result.deleted { " (deleted)" } else { "" };
            (t.result.new_pos, suffix)
        } else {
            (t.result.old_pos, "")
        };
        let label = format!("{} {}{}", t.label, pos, suffix);
        out.push(ruler.pointer_line(pos, &label, tone_of(t, after), opts));
    }
}

/// Render the whole frame for `view`. Lines are joined with `\n`, without a
/// trailing newline.
pub fn render_view(view: &SessionView, opts: &RenderOptions) -> String {
    let mut out = Vec::new();
    out.push(format!("Step: {} (bias {})", view.step, view.bias.as_str()));
    out.push(String::new());

    block(
        &mut out,
        "Before",
        &view.doc_before,
        view.step.highlight_range(),
        view,
        false,
        opts,
    );
    out.push(String::new());

    for t in view.tracked() {
        let mut line = format!("{}: {} -> {}", t.label, t.result.old_pos, t.result.new_pos);
        if t.result.deleted {
            line.push_str(" (deleted)");
            line = paint(&line, Tone::Deleted, opts);
        } else if !t.result.moved() {
            line.push_str(" (unchanged)");
        }
        out.push(line);
    }
    out.push(String::new());

    block(
        &mut out,
        "After",
        &view.doc_after,
        after_range(&view.step),
        view,
        true,
        opts,
    );
    out.push(String::new());

    let story = narrate(&view.step, view.bias, &view.primary.result);
    out.push(paint(&format!("== {} ==", story.title), Tone::Title, opts));
    out.push(story.body);
    out.join("\n")
}
