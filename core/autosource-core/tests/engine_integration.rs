//! End-to-end scenarios for the trust and transition engine, using real
//! marker files and the production marker lookup.

use std::collections::VecDeque;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use autosource_core::activation;
use autosource_core::{
    plan, DecisionStore, FsMarkerLookup, PromptInput, Result, TransitionPlan, TrustResolver,
};

struct ScriptedInput(VecDeque<&'static str>);

impl PromptInput for ScriptedInput {
    fn read_line(&mut self) -> Result<Option<String>> {
        Ok(self.0.pop_front().map(|line| format!("{line}\n")))
    }
}

fn scripted(lines: &[&'static str]) -> ScriptedInput {
    ScriptedInput(lines.iter().copied().collect())
}

/// A project directory with a real `.activate.sh`, owned by us.
fn make_project(root: &Path, name: &str) -> PathBuf {
    let project = root.join(name);
    fs_err::create_dir_all(&project).unwrap();
    let mut marker = fs_err::File::create(project.join(".activate.sh")).unwrap();
    writeln!(marker, ". ./venv/bin/activate").unwrap();
    project
}

fn find_allowed(config: &Path, input: &mut ScriptedInput, cwd: &Path) -> Option<PathBuf> {
    let mut store = DecisionStore::open(config).unwrap();
    let markers = FsMarkerLookup;
    let mut out: Vec<u8> = Vec::new();
    let mut resolver = TrustResolver::new(&mut store, &markers, input, &mut out);
    resolver.find_allowed(cwd).unwrap()
}

#[test]
fn first_activation_records_allow_and_plans_activate_only() {
    let temp = tempfile::tempdir().unwrap();
    let config = temp.path().join("config");
    let venv = make_project(temp.path(), "venv");

    let target = find_allowed(&config, &mut scripted(&["y"]), &venv);
    assert_eq!(target, Some(venv.clone()));

    let allowed = fs_err::read_to_string(config.join("allowed")).unwrap();
    assert_eq!(allowed, format!("{}\n", venv.display()));

    assert_eq!(
        plan(None, target.as_deref()),
        TransitionPlan {
            deactivate: false,
            activate: true
        }
    );
}

#[test]
fn leaving_the_project_plans_deactivate_only() {
    let temp = tempfile::tempdir().unwrap();
    let config = temp.path().join("config");
    let venv = make_project(temp.path(), "venv");

    // Decide "yes" once, then move to the parent directory.
    find_allowed(&config, &mut scripted(&["y"]), &venv);
    let target = find_allowed(&config, &mut scripted(&[]), temp.path());
    assert_eq!(target, None);

    assert_eq!(
        plan(Some(&venv), target.as_deref()),
        TransitionPlan {
            deactivate: true,
            activate: false
        }
    );
}

#[test]
fn switching_projects_plans_deactivate_then_activate() {
    let temp = tempfile::tempdir().unwrap();
    let config = temp.path().join("config");
    let venv = make_project(temp.path(), "venv");
    let venv2 = make_project(temp.path(), "venv2");

    find_allowed(&config, &mut scripted(&["y"]), &venv);
    let target = find_allowed(&config, &mut scripted(&["y"]), &venv2);
    assert_eq!(target, Some(venv2.clone()));

    assert_eq!(
        plan(Some(&venv), target.as_deref()),
        TransitionPlan {
            deactivate: true,
            activate: true
        }
    );
}

#[test]
fn resolving_from_inside_the_project_finds_its_root() {
    let temp = tempfile::tempdir().unwrap();
    let config = temp.path().join("config");
    let venv = make_project(temp.path(), "venv");
    let deep = venv.join("lib").join("nested");
    fs_err::create_dir_all(&deep).unwrap();

    let target = find_allowed(&config, &mut scripted(&["y"]), &deep);
    assert_eq!(target, Some(venv));
}

#[test]
fn entering_a_deeper_project_from_an_active_one_switches() {
    let temp = tempfile::tempdir().unwrap();
    let config = temp.path().join("config");
    let outer = make_project(temp.path(), "outer");
    let inner = make_project(&outer, "inner");

    find_allowed(&config, &mut scripted(&["y"]), &outer);
    let target = find_allowed(&config, &mut scripted(&["y"]), &inner);
    assert_eq!(target, Some(inner.clone()));

    assert_eq!(
        plan(Some(&outer), target.as_deref()),
        TransitionPlan {
            deactivate: true,
            activate: true
        }
    );
}

#[test]
fn already_active_resolution_is_a_noop_plan() {
    let temp = tempfile::tempdir().unwrap();
    let config = temp.path().join("config");
    let venv = make_project(temp.path(), "venv");

    find_allowed(&config, &mut scripted(&["y"]), &venv);
    let target = find_allowed(&config, &mut scripted(&[]), &venv);
    assert_eq!(target, Some(venv.clone()));

    assert!(plan(Some(&venv), target.as_deref()).is_noop());
}

#[test]
fn full_switch_emits_deactivate_before_activate() {
    let temp = tempfile::tempdir().unwrap();
    let run_dir = temp.path().join("run");
    let venv = make_project(temp.path(), "venv");
    let venv2 = make_project(temp.path(), "venv2");

    let mut env = std::collections::BTreeMap::new();
    env.insert(
        "XDG_RUNTIME_DIR".to_string(),
        run_dir.to_string_lossy().into_owned(),
    );
    env.insert("AUTOSOURCE_PID".to_string(), "7".to_string());
    env.insert("PATH".to_string(), "/usr/bin".to_string());

    // Activate venv, then pretend its script exported a variable.
    let _ = activation::activate_commands(&env, &venv, &venv).unwrap();
    let mut active_env = env.clone();
    active_env.insert("VIRTUAL_ENV".to_string(), venv.to_string_lossy().into_owned());
    active_env.insert(
        "AUTOSOURCE_ACTIVE".to_string(),
        venv.to_string_lossy().into_owned(),
    );

    let transition = plan(Some(&venv), Some(&venv2));
    assert!(transition.deactivate && transition.activate);

    let deactivation = activation::deactivate_commands(&active_env)
        .unwrap()
        .unwrap();
    let activation_script =
        activation::activate_commands(&deactivation.resulting_env, &venv2, &venv2).unwrap();
    let script = format!("{} &&\n{}", deactivation.commands, activation_script);

    // Deactivation lines come first, then the new export.
    let unset = script.find("unset VIRTUAL_ENV").unwrap();
    let export = script
        .find(&format!("export AUTOSOURCE_ACTIVE={}", venv2.display()))
        .unwrap();
    assert!(unset < export);

    // The successor's snapshot must not carry the outgoing project's vars.
    let state2 = activation::state_dir(&deactivation.resulting_env, &venv2).unwrap();
    let snapshot = autosource_core::snapshot::Snapshot::load(&state2).unwrap();
    assert!(!snapshot.env.contains_key("VIRTUAL_ENV"));
    assert!(!snapshot.env.contains_key("AUTOSOURCE_ACTIVE"));
}
