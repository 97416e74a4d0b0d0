mod common;
use common::*;

use core_config::{Settings, Template};
use core_events::{CommandEvent, Event, KeyEvent, ModMask, NamedKey, PageEvent};
use core_render::DropdownView;
use core_state::{Mode, TriggerKind};
use pretty_assertions::assert_eq;

fn names(page: &Page) -> Vec<String> {
    page.engine
        .session()
        .map(|s| s.ranked.iter().map(|t| t.name.clone()).collect())
        .unwrap_or_default()
}

#[test]
fn text_trigger_filters_from_after_the_token() {
    let mut page = Page::field(library());
    page.type_text("AI:Gre");

    let s = page.engine.session().expect("session open");
    assert_eq!(s.trigger_kind, TriggerKind::TextTrigger);
    assert_eq!(s.start_offset, 3);
    assert_eq!(s.filter_text, "Gre");
    assert_eq!(s.selected_index, Some(0));
    assert_eq!(names(&page), vec!["Greeting".to_string()]);
}

#[test]
fn choosing_a_template_with_placeholders_opens_the_form() {
    let mut page = Page::field(library());
    page.type_text("AI:Gre");
    assert!(page.press(NamedKey::Enter).consumed);

    assert_eq!(page.engine.mode(), Mode::PlaceholderCollection);
    let ph = page
        .engine
        .session()
        .and_then(|s| s.placeholder.as_ref())
        .expect("placeholder session");
    assert_eq!(ph.placeholders().len(), 1);
    assert_eq!(ph.placeholders()[0].name, "name");
    assert_eq!(ph.placeholders()[0].default_value, "");
    // Nothing inserted yet.
    assert_eq!(page.text(), "AI:Gre");
}

#[test]
fn filled_form_replaces_trigger_and_query() {
    let mut page = Page::field(library());
    page.type_text("AI:Gre");
    page.press(NamedKey::Enter);
    page.fill("World");

    match page.engine.view() {
        Some(DropdownView::Form { preview, .. }) => assert_eq!(preview.plain(), "Hello World!"),
        other => panic!("expected form view, got {other:?}"),
    }

    page.press(NamedKey::Enter);
    assert_eq!(page.text(), "Hello World!");
    assert_eq!(page.cursor(), Some(12));
    assert_eq!(page.engine.mode(), Mode::Idle);
    assert!(page.engine.view().is_none());
}

#[test]
fn empty_query_keeps_library_order() {
    let mut page = Page::field(library());
    page.send(Event::Command(CommandEvent::Toggle));
    assert_eq!(page.engine.mode(), Mode::Filtering);
    assert_eq!(
        names(&page),
        vec![
            "Greeting".to_string(),
            "Summary".to_string(),
            "Translate".to_string()
        ]
    );
}

#[test]
fn moving_caret_before_the_filter_start_aborts() {
    let mut page = Page::field(library());
    page.type_text("note AI:Sum");
    assert_eq!(page.engine.mode(), Mode::Filtering);
    let generation = page.engine.generation();

    page.move_caret(2);
    assert_eq!(page.engine.mode(), Mode::Idle);
    assert!(page.engine.generation() > generation);
    assert_eq!(page.text(), "note AI:Sum");
}

#[test]
fn caret_inside_the_trigger_closes_the_list() {
    let mut page = Page::field(library());
    page.type_text("AI:");
    assert_eq!(page.engine.mode(), Mode::Filtering);
    page.move_caret(2);
    assert_eq!(page.engine.mode(), Mode::Idle);
}

#[test]
fn default_values_fill_unanswered_placeholders() {
    let mut page = Page::field(library());
    page.type_text("AI:Tra");
    page.press(NamedKey::Enter);
    assert_eq!(page.engine.mode(), Mode::PlaceholderCollection);
    page.press(NamedKey::Enter);
    assert_eq!(page.text(), "Translate to French.");
}

#[test]
fn template_without_placeholders_inserts_directly() {
    let mut page = Page::field(library());
    page.type_text("draft: AI:summ");
    page.press(NamedKey::Enter);
    assert_eq!(page.engine.mode(), Mode::Idle);
    assert_eq!(page.text(), "draft: Summarize the text above.");
}

#[test]
fn block_editor_inserts_in_place() {
    let mut page = Page::blocks(library(), &["intro", ""]);
    page.type_text("AI:Gre");
    assert_eq!(page.text(), "intro\nAI:Gre");
    let s = page.engine.session().expect("session open");
    assert_eq!(s.start_offset, 9);

    page.press(NamedKey::Enter);
    page.fill("World");
    page.press(NamedKey::Enter);
    assert_eq!(page.text(), "intro\nHello World!");
    assert_eq!(page.cursor(), Some(18));
    assert_eq!(page.engine.mode(), Mode::Idle);
}

#[test]
fn block_editor_rebuilds_for_multi_line_templates() {
    let prompts = vec![Template::new("l", "Letter", "Dear team,\nThanks.")];
    let mut page = Page::blocks(prompts, &["top", ""]);
    page.type_text("AI:");
    page.press(NamedKey::Enter);
    assert_eq!(page.text(), "top\nDear team,\nThanks.");
    assert_eq!(page.engine.mode(), Mode::Idle);
}

#[test]
fn single_line_field_flattens_multi_line_templates() {
    let prompts = vec![Template::new("l", "Letter", "Dear team,\r\n\nThanks.")];
    let mut page = Page::field_with(Settings::default().with_prompts(prompts), false);
    page.type_text("AI:");
    page.press(NamedKey::Enter);
    assert_eq!(page.text(), "Dear team, Thanks.");
}

#[test]
fn custom_hotkey_activates_and_default_no_longer_does() {
    let settings = Settings {
        hotkey: "Alt+Space".to_string(),
        ..Settings::default().with_prompts(library())
    };
    let mut page = Page::field_with(settings, true);
    let target = page.root;

    let ctrl_shift_p = KeyEvent::char('P').with_mods(ModMask::CTRL | ModMask::SHIFT);
    let out = page.send(Event::Page(PageEvent::KeyDown {
        target,
        key: ctrl_shift_p,
    }));
    assert!(!out.consumed);
    assert_eq!(page.engine.mode(), Mode::Idle);

    let alt_space = KeyEvent::char(' ').with_mods(ModMask::ALT);
    let out = page.send(Event::Page(PageEvent::KeyDown {
        target,
        key: alt_space,
    }));
    assert!(out.consumed);
    assert_eq!(page.engine.mode(), Mode::Filtering);
}

#[test]
fn list_view_tracks_selection() {
    let mut page = Page::field(library());
    page.type_text("AI:");
    page.press(NamedKey::Down);
    match page.engine.view() {
        Some(DropdownView::List { rows, .. }) => {
            let selected: Vec<&str> = rows
                .iter()
                .filter(|r| r.selected)
                .map(|r| r.name.as_str())
                .collect();
            assert_eq!(selected, vec!["Summary"]);
        }
        other => panic!("expected list view, got {other:?}"),
    }
}
