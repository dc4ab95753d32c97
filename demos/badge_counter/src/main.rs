//! Badge Counter Demo
//!
//! A notification badge declares `count`, `label` and `hidden`. `hidden` is
//! already defined by its base type, so no accessor is generated for it.
//! Several writes per turn are delivered as one batch; the listener derives
//! `label` from `count`, which lands in the following batch.
//!
//! Run with `RUST_LOG=debug` to see the engine's own logging.

use coalesce_accessors::{reserved_names, AccessorGenerator, TypeChain, TypeLevel};
use coalesce_core::{
    ChangeBatch, EngineConfig, MicrotaskQueue, PropertiesChanged, PropertyInstance, ValueMap,
};
use std::rc::Rc;
use tracing::info;
use tracing_subscriber::EnvFilter;

struct BadgeRenderer {
    renders: usize,
}

impl PropertiesChanged for BadgeRenderer {
    fn properties_changed(&mut self, badge: &PropertyInstance, batch: &ChangeBatch) {
        self.renders += 1;
        println!("render #{}:", self.renders);
        for (name, value) in &batch.changed {
            let old = batch.old.get(name).cloned().unwrap_or_default();
            println!("  {name}: {old} -> {value}");
        }

        if let Some(count) = batch.changed.get("count").and_then(|v| v.as_int()) {
            let label = if count == 1 {
                "1 new message".to_string()
            } else {
                format!("{count} new messages")
            };
            if let Err(e) = badge.set_property("label", label) {
                tracing::error!(error = %e, "failed to update label");
            }
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Coalesce Badge Counter Demo ===\n");

    let chain = TypeChain::new()
        .extends(TypeLevel::new("HTMLElement", ["hidden", "title"]))
        .extends(TypeLevel::new("Element", ["id", "className"]));
    let generated = AccessorGenerator::new(reserved_names(&chain))
        .declare("count")?
        .declare("label")?
        .declare("hidden")?
        .with_proto_value("count", 0i64)
        .generate()?;
    info!(skipped = ?generated.skipped, "accessors generated");

    // Set by the constructor before accessors took over
    let mut fields = ValueMap::new();
    fields.insert("label".into(), "inbox".into());

    let queue = MicrotaskQueue::new();
    let badge = PropertyInstance::builder(generated.schema)
        .scheduler(Rc::new(queue.clone()))
        .listener(BadgeRenderer { renders: 0 })
        .config(EngineConfig::default())
        .build_with_fields(&mut fields)?;

    println!("-- ready");
    badge.ready()?;
    queue.run_until_idle();

    println!("\n-- three messages arrive in one turn");
    for n in 1..=3i64 {
        badge.set_property("count", n)?;
    }
    let ran = queue.run_until_idle();
    println!("({ran} microtasks ran)");

    println!("\n-- writing the same count again");
    badge.set_property("count", 3i64)?;
    let ran = queue.run_until_idle();
    println!("({ran} microtasks ran)");

    println!("\nfinal label: {}", badge.get("label"));
    Ok(())
}
