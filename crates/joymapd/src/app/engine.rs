use std::ops::ControlFlow;

use colored::Colorize;

use joymap_input::{
    is_synthetic, keyboard_descriptor, touch_descriptor, ButtonId, Canonicalizer,
    CanonicalEvent, CompoundControl, DeviceDescriptor, EventQueue, ListenerId,
    PlatformEvent,
};
use joymap_logical::{LogicalMask, Mapper, MapperConfig, PlayerEvent, TemplateStore};

use crate::{print_debug, print_info};

/// Owns the whole input pipeline: platform events go through the
/// canonicalizer into the mapper, which updates logical players.
#[derive(Debug)]
pub struct Engine {
    canonicalizer: Canonicalizer,
    mapper: Mapper,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(MapperConfig::default(), TemplateStore::default())
    }
}

impl Engine {
    pub fn new(config: MapperConfig, templates: TemplateStore) -> Self {
        Self {
            canonicalizer: Canonicalizer::new(),
            mapper: Mapper::new(config, templates),
        }
    }

    pub fn canonicalizer(&self) -> &Canonicalizer {
        &self.canonicalizer
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub fn mapper_mut(&mut self) -> &mut Mapper {
        &mut self.mapper
    }

    pub fn subscribe_canonical<F>(&mut self, callback: F) -> joymap_input::Result<ListenerId>
    where
        F: FnMut(&CanonicalEvent) -> ControlFlow<()> + 'static,
    {
        self.canonicalizer.subscribe(callback)
    }

    pub fn subscribe_players<F>(&mut self, callback: F) -> joymap_logical::Result<ListenerId>
    where
        F: FnMut(&PlayerEvent) -> ControlFlow<()> + 'static,
    {
        self.mapper.subscribe(callback)
    }

    pub fn handle_event(&mut self, event: &PlatformEvent) {
        self.handle_event_with(event, |_| {});
    }

    /// Run one platform event through the pipeline, reporting player
    /// events to `sink`.
    pub fn handle_event_with<F: FnMut(&PlayerEvent)>(
        &mut self,
        event: &PlatformEvent,
        mut sink: F,
    ) {
        let Self {
            canonicalizer,
            mapper,
        } = self;
        canonicalizer.process_with(event, |ev| mapper.on_canonical_event_with(ev, &mut sink));

        if let PlatformEvent::Connected(descriptor) = event {
            if !is_synthetic(descriptor.info.id) {
                self.bind_device(descriptor, &mut sink);
            }
        }
    }

    /// Drain `queue`. Returns the number of processed events.
    pub fn pump<Q: EventQueue>(&mut self, queue: &mut Q) -> usize {
        self.pump_with(queue, |_| {})
    }

    pub fn pump_with<Q, F>(&mut self, queue: &mut Q, mut sink: F) -> usize
    where
        Q: EventQueue,
        F: FnMut(&PlayerEvent),
    {
        let mut processed = 0;
        while let Some(event) = queue.poll() {
            self.handle_event_with(&event, &mut sink);
            processed += 1;
        }
        processed
    }

    pub fn set_keyboard_enabled_with<F: FnMut(&PlayerEvent)>(
        &mut self,
        enabled: bool,
        mut sink: F,
    ) {
        if self.canonicalizer.keyboard_enabled() == enabled {
            return;
        }
        let Self {
            canonicalizer,
            mapper,
        } = self;
        canonicalizer.set_keyboard_enabled_with(enabled, |ev| {
            mapper.on_canonical_event_with(ev, &mut sink);
        });
        if enabled {
            self.bind_device(&keyboard_descriptor(), &mut sink);
        }
    }

    pub fn set_touch_enabled_with<F: FnMut(&PlayerEvent)>(&mut self, enabled: bool, mut sink: F) {
        if self.canonicalizer.touch_enabled() == enabled {
            return;
        }
        let Self {
            canonicalizer,
            mapper,
        } = self;
        canonicalizer.set_touch_enabled_with(enabled, |ev| {
            mapper.on_canonical_event_with(ev, &mut sink);
        });
        if enabled {
            self.bind_device(&touch_descriptor(), &mut sink);
        }
    }

    pub fn set_multi_touch(&mut self, enabled: bool) {
        self.canonicalizer.set_multi_touch(enabled);
    }

    pub fn set_player_count_with<F: FnMut(&PlayerEvent)>(&mut self, count: usize, sink: F) -> usize {
        self.mapper.set_player_count_with(count, sink)
    }

    pub fn get_player_state(&self, player: usize) -> Option<LogicalMask> {
        self.mapper.get_player_state(player)
    }

    pub fn is_player_mapped(&self, player: usize) -> bool {
        self.mapper.is_player_mapped(player)
    }

    /// Resolve and apply the template of a freshly connected device.
    fn bind_device<F: FnMut(&PlayerEvent)>(&mut self, descriptor: &DeviceDescriptor, sink: F) {
        let info = &descriptor.info;
        if self.canonicalizer.device(info.id).is_none() {
            return;
        }
        let compounds = self.canonicalizer.compound_controls(info.id);
        let plain: Vec<ButtonId> = descriptor
            .controls
            .iter()
            .filter(|raw| CompoundControl::classify(raw).is_none())
            .map(|raw| raw.button_id)
            .collect();
        let template = self.mapper.resolve_template(info, &compounds, &plain);
        print_info!(
            "device {} \"{}\" vid=0x{:x} pid=0x{:x} mapped with {} rules",
            info.id,
            info.name,
            info.vendor_id,
            info.product_id,
            template.rules().len()
        );
        if template.rules().is_empty() {
            print_debug!("device {} drives no logical bits", info.id);
        }
        self.mapper.apply_template_with(info.id, &template, sink);
    }
}
