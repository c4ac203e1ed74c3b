use super::*;
use crate::kernel::bridge::RuntimeEvent;
use crate::kernel::extension::{BlockInfo, BlockMeta, CategoryInfo, DeviceExtensionPackage, ExtensionInfo};
use crate::kernel::model::{Costume, EditTarget, VariableKind, WorkspaceViewport};
use crate::kernel::prompt::PromptResponse;
use crate::kernel::services::adapters::HeadlessRig;
use crate::kernel::services::ports::LocaleCompletion;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

const SPRITE_SCRIPT: &str = r#"[{"opcode":"event_whenflagclicked"}]"#;

struct Fixture {
    rig: HeadlessRig,
    blocks: Blocks,
    now: Instant,
}

impl Fixture {
    fn new() -> Self {
        Self::with_catalog(catalog())
    }

    fn with_catalog(catalog: Vec<DeviceDescriptor>) -> Self {
        let rig = HeadlessRig::new("en");
        rig.runtime.add_target(
            EditTarget {
                id: "stage".to_string(),
                is_stage: true,
                costumes: vec![Costume {
                    name: "backdrop1".to_string(),
                }],
                ..EditTarget::default()
            },
            "",
        );
        rig.runtime.add_target(
            EditTarget {
                id: "sprite1".to_string(),
                costumes: vec![Costume {
                    name: "costume1".to_string(),
                }],
                ..EditTarget::default()
            },
            SPRITE_SCRIPT,
        );
        rig.runtime
            .set_editing_target("sprite1")
            .expect("select sprite");

        let now = Instant::now();
        let blocks = Blocks::new(rig.parts(), catalog, &Settings::default(), now);
        let mut fixture = Self { rig, blocks, now };
        fixture.settle();
        fixture
    }

    fn tick(&mut self) {
        self.blocks.tick(self.now);
    }

    fn advance(&mut self, ms: u64) {
        self.now += Duration::from_millis(ms);
        self.tick();
    }

    fn settle(&mut self) {
        for _ in 0..32 {
            self.tick();
            match self.blocks.next_deadline() {
                Some(deadline) => self.now = self.now.max(deadline),
                None => return,
            }
        }
        panic!("controller did not settle");
    }

    fn emit(&mut self, event: RuntimeEvent) {
        self.rig.runtime.emit(event);
        self.tick();
    }

    fn regenerations(&self) -> usize {
        self.blocks.state().toolbox.passes as usize
    }

    fn revision(&self) -> u64 {
        self.blocks.toolbox().map(|t| t.revision).unwrap_or(0)
    }

    fn category_ids(&self) -> Vec<String> {
        self.blocks
            .toolbox()
            .map(|t| t.category_ids().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

fn device(id: &str, device_type: &str, modes: &[ProgramMode], default: Option<ProgramMode>) -> DeviceDescriptor {
    DeviceDescriptor {
        device_id: id.to_string(),
        name: id.to_string(),
        device_type: device_type.to_string(),
        program_modes: modes.to_vec(),
        default_program_mode: default,
        default_baud_rate: None,
        launch_peripheral_connection_flow: false,
    }
}

fn catalog() -> Vec<DeviceDescriptor> {
    let both = [ProgramMode::Interactive, ProgramMode::Deploy];
    let mut uno = device("arduinoUno", "arduino", &both, Some(ProgramMode::Deploy));
    uno.default_baud_rate = Some(9600);
    let mut wedo = device("wedo", "wedo", &[ProgramMode::Interactive], None);
    wedo.launch_peripheral_connection_flow = true;
    vec![
        uno,
        device("esp32", "esp32", &[ProgramMode::Deploy], None),
        device("gadget", "custom", &[ProgramMode::Deploy], None),
        device("blank", "", &both, None),
        wedo,
    ]
}

fn pins_category() -> CategoryInfo {
    CategoryInfo {
        id: "pins".to_string(),
        name: "Pins".to_string(),
        blocks: vec![
            BlockInfo {
                info: Some(BlockMeta {
                    opcode: "write".to_string(),
                    ..BlockMeta::default()
                }),
                json: Some(json!({ "type": "pins_write" })),
            },
            BlockInfo {
                info: Some(BlockMeta {
                    opcode: "blink".to_string(),
                    is_dynamic: true,
                    ..BlockMeta::default()
                }),
                json: None,
            },
        ],
        menus: vec![BlockInfo {
            info: None,
            json: Some(json!({ "type": "pins_menu_pin" })),
        }],
        ..CategoryInfo::default()
    }
}

fn added(device_id: Option<&str>, categories: Vec<CategoryInfo>) -> RuntimeEvent {
    RuntimeEvent::ExtensionAdded(ExtensionInfo {
        device_id: device_id.map(str::to_string),
        categories,
    })
}

fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> ToolboxCallback) {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&calls);
    let make = move |label: &'static str| -> ToolboxCallback {
        let sink = Rc::clone(&sink);
        Box::new(move |_: &mut Blocks| sink.borrow_mut().push(label))
    };
    (calls, make)
}

#[test]
fn mount_wires_canvas_runtime_and_first_toolbox() {
    let f = Fixture::new();
    assert!(f.rig.canvas.is_injected());
    assert!(f.rig.canvas.is_change_listener_attached());
    assert!(f.blocks.is_bridge_attached());
    assert_eq!(f.rig.runtime.listener_count(), 16);
    assert_eq!(f.rig.canvas.locale(), "en");
    assert!(f.rig.canvas.is_recycling_enabled());
    assert_eq!(f.revision(), 1);
    assert_eq!(f.category_ids()[0], "motion");
    assert_eq!(f.rig.shell.record().toolbox_revision, Some(1));
    assert_eq!(f.rig.canvas.content(), Some(json!([{ "opcode": "event_whenflagclicked" }])));
}

#[test]
fn requests_before_a_tick_coalesce_into_one_regeneration() {
    let mut f = Fixture::new();
    let before = f.regenerations();
    for _ in 0..5 {
        f.blocks.request_toolbox_update();
    }
    assert!(f.blocks.is_pending(TaskSlot::ToolboxUpdate));
    f.tick();
    assert_eq!(f.regenerations(), before + 1);
    assert!(!f.blocks.is_pending(TaskSlot::ToolboxUpdate));
}

#[test]
fn unchanged_toolbox_keeps_palette_content() {
    let mut f = Fixture::new();
    let replacements = f.rig.canvas.palette_replacements();
    f.blocks.request_toolbox_update();
    f.tick();
    assert_eq!(f.revision(), 1);
    assert_eq!(f.rig.canvas.palette_replacements(), replacements);
}

#[test]
fn unchanged_regeneration_skips_the_update_bracket() {
    let mut f = Fixture::new();
    let passes = f.regenerations();
    let will = f.rig.shell.count("toolbox_will_update");
    f.blocks.request_toolbox_update();
    f.tick();
    assert_eq!(f.regenerations(), passes + 1);
    assert_eq!(f.rig.shell.count("toolbox_will_update"), will);
}

#[test]
fn every_palette_upload_pairs_will_and_did_update() {
    let mut f = Fixture::new();
    assert_eq!(f.rig.shell.count("toolbox_will_update"), 1);
    f.emit(RuntimeEvent::ToolboxUploadFinish);

    f.rig.runtime.set_editing_target("stage").expect("stage");
    f.tick();
    assert_eq!(f.revision(), 2);
    assert_eq!(f.rig.shell.count("toolbox_will_update"), 2);
    assert_eq!(f.rig.shell.count("toolbox_did_update"), 1);
    f.emit(RuntimeEvent::ToolboxUploadFinish);

    f.blocks.request_toolbox_update();
    f.tick();
    assert_eq!(f.rig.shell.count("toolbox_will_update"), 2);
    assert_eq!(f.rig.shell.count("toolbox_did_update"), 2);
}

#[test]
fn device_extension_forces_a_redraw() {
    let mut f = Fixture::new();
    f.emit(added(Some("arduinoUno"), Vec::new()));
    assert_eq!(f.revision(), 2);
    f.emit(added(Some("arduinoUno"), Vec::new()));
    assert_eq!(f.revision(), 3);
    f.blocks.request_toolbox_update();
    f.tick();
    assert_eq!(f.revision(), 3);
}

#[test]
fn plain_extension_without_categories_keeps_the_palette() {
    let mut f = Fixture::new();
    let replacements = f.rig.canvas.palette_replacements();
    f.emit(added(None, Vec::new()));
    assert_eq!(f.revision(), 1);
    assert!(!f.blocks.state().toolbox.force_redraw);
    assert_eq!(f.rig.canvas.palette_replacements(), replacements);
}

#[test]
fn with_toolbox_updates_runs_now_when_idle() {
    let mut f = Fixture::new();
    let (calls, make) = recorder();
    f.blocks.with_toolbox_updates(make("idle"));
    assert_eq!(*calls.borrow(), vec!["idle"]);
}

#[test]
fn queued_callbacks_run_once_in_order_after_regeneration() {
    let mut f = Fixture::new();
    let (calls, make) = recorder();
    f.blocks.request_toolbox_update();
    f.blocks.with_toolbox_updates(make("first"));
    f.blocks.with_toolbox_updates(make("second"));
    assert!(calls.borrow().is_empty());

    f.tick();
    assert_eq!(*calls.borrow(), vec!["first", "second"]);
    f.blocks.request_toolbox_update();
    f.tick();
    assert_eq!(calls.borrow().len(), 2);
}

#[test]
fn scroll_offset_survives_regeneration() {
    let mut f = Fixture::new();
    let mut palette = f.rig.canvas.clone();
    palette.select_category("looks");
    let looks = palette.category_position("looks").expect("looks");
    palette.set_scroll_position(looks + 30.0);

    f.rig.runtime.set_editing_target("stage").expect("stage");
    f.tick();

    assert!(!f.category_ids().contains(&"motion".to_string()));
    assert_eq!(palette.category_position("looks"), Some(0.0));
    assert_eq!(palette.scroll_position(), 30.0);
}

#[test]
fn offset_past_shrunk_category_snaps_to_its_start() {
    let mut f = Fixture::new();
    let mut palette = f.rig.canvas.clone();
    palette.select_category("looks");
    let looks = palette.category_position("looks").expect("looks");
    palette.set_scroll_position(looks + 200.0);

    f.rig.runtime.set_editing_target("stage").expect("stage");
    f.tick();

    assert_eq!(palette.scroll_position(), 0.0);
}

#[test]
fn failed_synthesis_keeps_prior_toolbox_and_flushes_queue() {
    let mut f = Fixture::new();
    let (calls, make) = recorder();
    f.blocks.request_toolbox_update();
    f.blocks.with_toolbox_updates(make("after"));

    let will = f.rig.shell.count("toolbox_will_update");
    f.emit(added(Some("blank"), Vec::new()));

    assert_eq!(f.revision(), 1);
    assert_eq!(f.rig.shell.count("toolbox_will_update"), will);
    assert_eq!(f.category_ids()[0], "motion");
    assert_eq!(*calls.borrow(), vec!["after"]);
}

#[test]
fn workspace_update_reloads_canvas_and_clears_undo() {
    let mut f = Fixture::new();
    f.rig.canvas.record_edit();
    assert_eq!(f.rig.canvas.undo_depth(), 1);

    f.rig.runtime.add_target(
        EditTarget {
            id: "sprite2".to_string(),
            ..EditTarget::default()
        },
        r#"[{"opcode":"looks_show"}]"#,
    );
    f.rig.runtime.set_editing_target("sprite2").expect("sprite2");
    f.tick();

    assert_eq!(f.rig.canvas.content(), Some(json!([{ "opcode": "looks_show" }])));
    assert_eq!(f.rig.canvas.undo_depth(), 0);
    assert!(f.rig.canvas.is_change_listener_attached());
}

#[test]
fn load_failure_still_reattaches_listener() {
    let mut f = Fixture::new();
    f.rig.runtime.add_target(
        EditTarget {
            id: "broken".to_string(),
            ..EditTarget::default()
        },
        "{ not json",
    );
    let before = f.regenerations();
    f.rig.runtime.set_editing_target("broken").expect("broken");
    f.tick();

    assert!(!f.rig.canvas.has_content());
    assert!(f.rig.canvas.is_change_listener_attached());
    assert_eq!(f.rig.canvas.undo_depth(), 0);
    assert_eq!(f.regenerations(), before + 1);
}

#[test]
fn first_visit_captures_viewport_and_return_restores_it() {
    let mut f = Fixture::new();
    assert!(f.blocks.remembered_viewport("sprite1").is_some());

    let scrolled = WorkspaceViewport {
        scroll_x: 120.0,
        scroll_y: -40.0,
        scale: 1.2,
    };
    f.rig.canvas.scroll_to(scrolled);
    f.blocks.on_canvas_metrics_changed();
    assert!(f.blocks.is_pending(TaskSlot::MetricsDispatch));
    f.tick();
    assert_eq!(f.blocks.remembered_viewport("sprite1"), Some(scrolled));
    assert_eq!(f.rig.shell.count("metrics sprite1"), 2);

    f.rig.runtime.set_editing_target("stage").expect("stage");
    f.tick();
    assert!(f.blocks.remembered_viewport("stage").is_some());

    f.rig.canvas.scroll_to(WorkspaceViewport::default());
    let resizes = f.rig.canvas.resize_count();
    f.rig.runtime.set_editing_target("sprite1").expect("sprite1");
    f.tick();
    assert_eq!(f.rig.canvas.viewport(), scrolled);
    assert_eq!(f.rig.canvas.resize_count(), resizes + 1);
}

#[test]
fn metrics_capture_skipped_when_target_changed() {
    let mut f = Fixture::new();
    f.blocks.reconcile_workspace("ghost", "[]");
    f.tick();
    assert_eq!(f.blocks.remembered_viewport("ghost"), None);
    assert_eq!(f.rig.shell.count("metrics ghost"), 0);
}

#[test]
fn target_moves_are_debounced_into_motion_fields() {
    let mut f = Fixture::new();
    assert_eq!(f.rig.canvas.field_value("setx").as_deref(), Some("0"));

    f.rig.runtime.move_target("sprite1", 3.0, 4.0).expect("move");
    f.tick();
    f.advance(50);
    f.rig.runtime.move_target("sprite1", 10.6, -3.2).expect("move");
    f.tick();
    f.advance(60);
    assert_eq!(f.rig.canvas.field_value("setx").as_deref(), Some("0"));

    f.advance(60);
    for (field, value) in [
        ("glidex", "11"),
        ("glidey", "-3"),
        ("movex", "11"),
        ("movey", "-3"),
        ("setx", "11"),
        ("sety", "-3"),
    ] {
        assert_eq!(f.rig.canvas.field_value(field).as_deref(), Some(value), "{field}");
    }
}

#[test]
fn dual_mode_device_selects_default_and_enables_switch() {
    let mut f = Fixture::new();
    f.emit(added(Some("arduinoUno"), vec![pins_category()]));

    let record = f.rig.shell.record();
    assert_eq!(record.selected_device.as_deref(), Some("arduinoUno"));
    assert_eq!(record.baudrate, Some(9600));
    assert!(record.support_switch_mode);
    assert_eq!(f.blocks.program_mode(), ProgramMode::Deploy);
    assert_eq!(f.rig.runtime.current_program_mode(), ProgramMode::Deploy);
    assert_eq!(f.rig.canvas.program_mode(), ProgramMode::Deploy);
    assert_eq!(
        f.rig.canvas.device(),
        Some(("arduinoUno".to_string(), "arduino".to_string()))
    );
    assert_eq!(f.rig.shell.count("code_editor_value len=0"), 1);

    let ids = f.category_ids();
    assert!(!ids.contains(&"motion".to_string()));
    assert_eq!(ids.last().map(String::as_str), Some("pins"));
}

#[test]
fn extension_blocks_are_defined_in_batches() {
    let mut f = Fixture::new();
    f.emit(added(Some("arduinoUno"), vec![pins_category()]));
    assert_eq!(f.rig.canvas.static_definition_count(), 2);
    assert_eq!(f.rig.canvas.dynamic_opcodes(), vec!["pins_blink".to_string()]);
}

#[test]
fn second_device_resets_to_interactive() {
    let mut f = Fixture::new();
    f.emit(added(Some("arduinoUno"), vec![pins_category()]));
    f.emit(added(Some("esp32"), Vec::new()));

    assert_eq!(f.blocks.program_mode(), ProgramMode::Interactive);
    assert!(!f.rig.shell.record().support_switch_mode);
    assert_eq!(f.blocks.state().devices.len(), 2);
}

#[test]
fn reannounced_device_leaves_policy_alone() {
    let mut f = Fixture::new();
    f.emit(added(Some("arduinoUno"), vec![pins_category()]));
    f.blocks
        .switch_program_mode(ProgramMode::Interactive)
        .expect("switch");
    let switch_logs = f.rig.shell.count("support_switch_mode");

    f.emit(RuntimeEvent::BlocksInfoUpdate(ExtensionInfo {
        device_id: Some("arduinoUno".to_string()),
        categories: vec![pins_category()],
    }));

    assert_eq!(f.blocks.program_mode(), ProgramMode::Interactive);
    assert_eq!(f.rig.shell.count("support_switch_mode"), switch_logs);
    assert_eq!(f.blocks.state().extensions.len(), 1);
}

#[test]
fn removing_last_device_resets_policy_and_categories() {
    let mut f = Fixture::new();
    f.emit(added(Some("arduinoUno"), vec![pins_category()]));
    f.emit(RuntimeEvent::ExtensionRemoved {
        extension_id: "pins".to_string(),
        device_id: Some("arduinoUno".to_string()),
    });

    assert!(f.blocks.state().devices.is_empty());
    assert!(f.blocks.state().extensions.is_empty());
    assert_eq!(f.blocks.program_mode(), ProgramMode::Interactive);
    assert!(!f.rig.shell.record().support_switch_mode);
    assert_eq!(f.rig.shell.count("device_removed arduinoUno"), 1);
    assert!(!f.category_ids().contains(&"pins".to_string()));
    assert_eq!(f.category_ids()[0], "motion");
}

#[test]
fn removing_one_of_two_devices_keeps_policy() {
    let mut f = Fixture::new();
    f.emit(added(Some("arduinoUno"), Vec::new()));
    f.emit(added(Some("esp32"), Vec::new()));
    let switch_logs = f.rig.shell.count("support_switch_mode");

    f.emit(RuntimeEvent::ExtensionRemoved {
        extension_id: "esp".to_string(),
        device_id: Some("esp32".to_string()),
    });

    assert_eq!(f.blocks.state().devices.len(), 1);
    assert_eq!(f.rig.shell.count("support_switch_mode"), switch_logs);
}

#[test]
fn unknown_device_is_skipped() {
    let mut f = Fixture::new();
    f.emit(added(Some("ghost"), vec![pins_category()]));
    assert!(f.blocks.state().devices.is_empty());
    assert_eq!(f.rig.shell.count("device_selected"), 0);
    assert_eq!(f.blocks.state().extensions.len(), 1);
}

#[test]
fn device_extension_installs_and_reapplies_locale_without_refresh() {
    let mut f = Fixture::new();
    let refreshes = f.rig.runtime.refresh_count();
    let before = f.regenerations();

    f.emit(RuntimeEvent::DeviceExtensionAdded(DeviceExtensionPackage {
        extension_id: "neopixel".to_string(),
        blocks: vec![json!({ "type": "neopixel_show" })],
        ..DeviceExtensionPackage::default()
    }));

    assert_eq!(f.rig.canvas.installed_extensions(), vec!["neopixel".to_string()]);
    assert_eq!(f.rig.runtime.refresh_count(), refreshes);
    assert_eq!(f.regenerations(), before + 1);
    assert!(f.rig.canvas.is_recycling_enabled());

    f.emit(RuntimeEvent::DeviceExtensionRemoved {
        extension_id: "neopixel".to_string(),
    });
    assert_eq!(f.regenerations(), before + 2);
}

#[test]
fn locked_editor_in_deploy_mode_gets_generated_code() {
    let mut f = Fixture::new();
    f.emit(added(Some("arduinoUno"), Vec::new()));
    f.blocks.set_code_editor_locked(true);

    let code = f.rig.shell.record().code_editor_value;
    assert!(code.starts_with("// generated by arduino"), "{code}");

    f.blocks.set_code_editor_locked(false);
    f.emit(RuntimeEvent::CodeNeedUpdate);
    assert_eq!(f.rig.shell.count("code_editor_unlocked"), 1);
}

#[test]
fn generator_error_is_shown_in_code_editor() {
    let mut f = Fixture::new();
    f.emit(added(Some("gadget"), Vec::new()));
    f.blocks.set_code_editor_locked(true);
    assert_eq!(
        f.rig.shell.record().code_editor_value,
        "code generation failed: no generator named custom"
    );
}

#[test]
fn empty_canvas_clears_generated_code() {
    let mut f = Fixture::new();
    f.emit(added(Some("arduinoUno"), Vec::new()));
    f.blocks.set_code_editor_locked(true);
    assert!(f.rig.shell.record().code_editor_value.starts_with("// generated by arduino"));

    f.rig.runtime.set_editing_target("stage").expect("stage");
    f.tick();
    assert!(!f.rig.canvas.has_content());
    f.emit(RuntimeEvent::CodeNeedUpdate);
    assert_eq!(f.rig.shell.record().code_editor_value, "");
}

#[test]
fn interactive_mode_leaves_code_editor_alone() {
    let mut f = Fixture::new();
    f.blocks.set_code_editor_locked(true);
    f.emit(RuntimeEvent::CodeNeedUpdate);
    assert_eq!(f.rig.shell.record().code_editor_value, "");
    assert_eq!(f.rig.shell.count("code_editor"), 0);
}

#[test]
fn switch_requires_dual_mode_devices() {
    let mut f = Fixture::new();
    assert_eq!(
        f.blocks.switch_program_mode(ProgramMode::Deploy),
        Err(ModeError::SwitchUnsupported)
    );

    f.emit(added(Some("arduinoUno"), Vec::new()));
    f.blocks.set_code_editor_locked(true);
    f.blocks
        .switch_program_mode(ProgramMode::Interactive)
        .expect("switch");
    assert_eq!(f.rig.canvas.program_mode(), ProgramMode::Interactive);
    f.blocks.switch_program_mode(ProgramMode::Deploy).expect("switch");
    assert!(f
        .rig
        .shell
        .record()
        .code_editor_value
        .starts_with("// generated by arduino"));
}

#[test]
fn hidden_canvas_defers_regeneration_until_visible() {
    let mut f = Fixture::new();
    f.blocks.set_visible(false);
    assert!(!f.rig.canvas.is_visible());
    let before = f.regenerations();

    f.blocks.request_toolbox_update();
    f.tick();
    assert!(f.blocks.state().toolbox.stale);
    assert_eq!(f.regenerations(), before);

    f.blocks.set_visible(true);
    f.tick();
    assert!(f.rig.canvas.is_visible());
    assert!(!f.blocks.state().toolbox.stale);
    assert_eq!(f.regenerations(), before + 1);
}

#[test]
fn locale_drift_while_hidden_is_reapplied_on_show() {
    let mut f = Fixture::new();
    f.blocks.set_visible(false);

    let (tx, _rx) = kernel_bus();
    let mut runtime = f.rig.runtime.clone();
    runtime.set_locale("de", LocaleCompletion::new(tx, "de".to_string(), false));
    assert_eq!(f.rig.runtime.locale(), "de");

    let refreshes = f.rig.runtime.refresh_count();
    f.blocks.set_visible(true);
    assert_eq!(f.rig.runtime.locale(), "en");
    f.tick();
    assert_eq!(f.rig.runtime.refresh_count(), refreshes + 1);
    assert!(f.rig.canvas.is_recycling_enabled());
}

#[test]
fn recycling_stays_off_until_localized_toolbox_is_in() {
    let mut f = Fixture::new();
    f.rig.runtime.hold_locale_completions(true);
    f.blocks.set_locale("fr", true);
    f.tick();
    assert_eq!(f.rig.canvas.locale(), "fr");

    let seen = Rc::new(RefCell::new(None));
    let canvas = f.rig.canvas.clone();
    let sink = Rc::clone(&seen);
    f.blocks.request_toolbox_update();
    f.blocks.with_toolbox_updates(move |_: &mut Blocks| {
        *sink.borrow_mut() = Some(canvas.is_recycling_enabled());
    });

    let refreshes = f.rig.runtime.refresh_count();
    assert_eq!(f.rig.runtime.complete_locale(), 1);
    f.tick();

    assert_eq!(*seen.borrow(), Some(false));
    assert!(f.rig.canvas.is_recycling_enabled());
    assert_eq!(f.rig.runtime.refresh_count(), refreshes + 1);
}

#[test]
fn modal_rising_edge_hides_chaff() {
    let mut f = Fixture::new();
    f.blocks.set_any_modal_visible(true);
    f.blocks.set_any_modal_visible(true);
    assert_eq!(f.rig.canvas.chaff_hidden(), 1);
    f.blocks.set_any_modal_visible(false);
    f.blocks.set_any_modal_visible(true);
    assert_eq!(f.rig.canvas.chaff_hidden(), 2);
}

#[test]
fn glow_and_report_events_reach_canvas() {
    let mut f = Fixture::new();
    f.emit(RuntimeEvent::ScriptGlowOn { id: "s1".to_string() });
    f.emit(RuntimeEvent::BlockGlowOn { id: "b1".to_string() });
    assert!(f.rig.canvas.is_stack_glowing("s1"));
    assert!(f.rig.canvas.is_block_glowing("b1"));

    f.emit(RuntimeEvent::ScriptGlowOff { id: "s1".to_string() });
    f.emit(RuntimeEvent::VisualReport {
        id: "b1".to_string(),
        value: "42".to_string(),
    });
    assert!(!f.rig.canvas.is_stack_glowing("s1"));
    assert_eq!(
        f.rig.canvas.reports(),
        vec![("b1".to_string(), "42".to_string())]
    );
}

#[test]
fn peripheral_and_upload_events() {
    let mut f = Fixture::new();
    f.emit(RuntimeEvent::PeripheralConnected {
        device_id: "arduinoUno".to_string(),
    });
    f.emit(RuntimeEvent::PeripheralDisconnected {
        device_id: "arduinoUno".to_string(),
    });
    f.emit(RuntimeEvent::ToolboxUploadFinish);
    assert_eq!(f.rig.canvas.status_refreshes(), 2);
    assert_eq!(f.rig.shell.count("toolbox_did_update"), 1);
}

#[test]
fn prompt_open_and_close_reach_shell() {
    let mut f = Fixture::new();
    f.blocks
        .open_prompt(PromptRequest::new("name?", "", |_| Ok(())))
        .expect("open");
    assert_eq!(
        f.rig.shell.record().prompt_title.as_deref(),
        Some("New Variable")
    );
    assert!(matches!(
        f.blocks.open_prompt(PromptRequest::new("again?", "", |_| Ok(()))),
        Err(PromptError::AlreadyOpen)
    ));

    f.blocks
        .confirm_prompt("speed", VariableOptions::default())
        .expect("confirm");
    assert_eq!(f.rig.shell.record().prompt_title, None);
    assert!(f.blocks.prompt_view().is_none());
    assert!(!f.blocks.cancel_prompt());
}

#[test]
fn rejected_prompt_input_keeps_prompt_open() {
    let mut f = Fixture::new();
    f.rig
        .runtime
        .set_variables(VariableKind::Scalar, vec!["x".to_string(), "y".to_string()]);
    f.blocks
        .open_prompt(PromptRequest::new("name?", "", |response: PromptResponse| {
            if response.existing_names.contains(&response.input) {
                Err(PromptError::Rejected("taken".to_string()))
            } else {
                Ok(())
            }
        }))
        .expect("open");

    let err = f
        .blocks
        .confirm_prompt("x", VariableOptions::default())
        .expect_err("duplicate");
    assert_eq!(err.to_string(), "taken");
    assert!(f.blocks.prompt_view().is_some());
    assert_eq!(f.rig.shell.count("prompt_closed"), 0);
    assert_eq!(
        f.rig.shell.record().prompt_title.as_deref(),
        Some("New Variable")
    );

    f.blocks
        .confirm_prompt("z", VariableOptions::default())
        .expect("confirm");
    assert!(f.blocks.prompt_view().is_none());
    assert_eq!(f.rig.shell.count("prompt_closed"), 1);
}

#[test]
fn drop_shares_blocks_into_editing_target() {
    let mut f = Fixture::new();
    let refreshes = f.rig.runtime.refresh_count();
    f.blocks
        .handle_drop(r#"[{"opcode":"looks_hide"}]"#)
        .expect("drop");
    let script = f.rig.runtime.script("sprite1").expect("script");
    assert!(script.contains("looks_hide"));
    assert_eq!(f.rig.runtime.refresh_count(), refreshes + 1);
    assert!(f.blocks.is_pending(TaskSlot::ToolboxUpdate));

    assert!(matches!(
        f.blocks.handle_drop("not blocks"),
        Err(RuntimeError::InvalidBlocks(_))
    ));
}

#[test]
fn closing_custom_procedures_scrolls_to_my_blocks() {
    let mut f = Fixture::new();
    f.blocks.handle_custom_procedures_closed();
    let palette = f.rig.canvas.clone();
    assert_eq!(palette.selected_category().as_deref(), Some("myBlocks"));
    assert_eq!(
        Some(palette.scroll_position()),
        palette.category_position("myBlocks")
    );
}

#[test]
fn category_selection_waits_for_pending_regeneration() {
    let mut f = Fixture::new();
    let palette = f.rig.canvas.clone();
    f.blocks.handle_category_selected("sound");
    assert_eq!(palette.selected_category().as_deref(), Some("sound"));

    f.blocks.request_toolbox_update();
    f.blocks.handle_category_selected("events");
    assert_eq!(palette.selected_category().as_deref(), Some("sound"));
    f.tick();
    assert_eq!(palette.selected_category().as_deref(), Some("events"));
}

#[test]
fn device_selection_opens_connection_flow_when_requested() {
    let mut f = Fixture::new();
    f.blocks.handle_device_selected("wedo");
    f.blocks.handle_device_selected("arduinoUno");
    assert_eq!(f.rig.shell.record().connection_modal_opened, 1);
}

#[test]
fn dispose_detaches_and_cancels_everything() {
    let mut f = Fixture::new();
    let (calls, make) = recorder();
    f.blocks.request_toolbox_update();
    f.blocks.with_toolbox_updates(make("never"));
    let before = f.regenerations();

    f.blocks.dispose();
    assert!(f.blocks.is_disposed());
    assert!(!f.blocks.is_bridge_attached());
    assert_eq!(f.rig.runtime.listener_count(), 0);
    assert!(f.rig.canvas.is_disposed());
    assert!(!f.blocks.is_pending(TaskSlot::ToolboxUpdate));

    assert_eq!(f.rig.runtime.emit(RuntimeEvent::TargetsUpdate), 0);
    f.advance(500);
    assert_eq!(f.regenerations(), before);
    assert!(calls.borrow().is_empty());
}
