#![allow(dead_code)]

use std::rc::Rc;

use mixtree::{Dispatcher, DispatcherConfig, MemoryPort};
use mixtree_core::{
    BooleanValue, Collection, Command, Container, FloatValue, ItemsDef, Root, Schema, StringValue,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

pub fn channel_schema() -> Rc<Schema> {
    Schema::builder("channel")
        .property("fader", FloatValue::new)
        .property("on", BooleanValue::new)
        .property("name", StringValue::new)
        .callable(true)
        .build()
}

/// `/info`, `/main` (a channel), `/ch/01` .. `/ch/04` and `/save`.
pub fn console_schema() -> Rc<Schema> {
    let main = channel_schema();
    let strip = channel_schema();
    Schema::builder("console")
        .property("info", StringValue::new)
        .property("main", move || Container::new(Rc::clone(&main)))
        .property("ch", move || {
            let strip = Rc::clone(&strip);
            Collection::<Rc<Container>>::with_items(
                "channels",
                ItemsDef::new(4, move |_| Container::new(Rc::clone(&strip))).pad(2),
            )
        })
        .property("save", Command::new)
        .build()
}

pub struct Console {
    pub root: Root,
    pub port: Rc<MemoryPort>,
    pub dispatcher: Dispatcher,
}

pub fn console() -> Console {
    console_with(DispatcherConfig::default())
}

pub fn console_with(config: DispatcherConfig) -> Console {
    init_tracing();
    let port = Rc::new(MemoryPort::new());
    let dispatcher = Dispatcher::with_config(port.clone(), config);
    Console {
        root: Root::new(console_schema()),
        port,
        dispatcher,
    }
}
