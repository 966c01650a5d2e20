use std::ops::ControlFlow;

use ahash::AHashMap;
use joymap_input::{
    is_synthetic, ButtonId, CanonicalEvent, CompoundControl, DeviceId, DeviceInfo,
    ListenerId, ListenerTable, Part,
};

use crate::config::{MapperConfig, MAX_PLAYERS};
use crate::generate::generate_template;
use crate::store::TemplateStore;
use crate::template::{LogicalMask, Template, LOGICAL_BITS};
use crate::Result;

/// Aggregate player: the OR of every real player.
pub const AGGREGATE_PLAYER: usize = 0;

/// A single logical bit of a player changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerEvent {
    pub player: usize,
    /// The changed bit.
    pub button: LogicalMask,
    pub value: bool,
    /// Player state after the change.
    pub state: LogicalMask,
}

#[derive(Debug, Clone, Copy)]
struct ActiveRule {
    mask: LogicalMask,
    active: bool,
}

#[derive(Debug)]
struct MappedDevice {
    synthetic: bool,
    /// Zero while unassigned.
    player: usize,
    rules: AHashMap<(ButtonId, Part), ActiveRule>,
}

impl MappedDevice {
    fn new(id: DeviceId) -> Self {
        Self {
            synthetic: is_synthetic(id),
            player: 0,
            rules: AHashMap::new(),
        }
    }

    fn mask(&self) -> LogicalMask {
        self.rules
            .values()
            .filter(|r| r.active)
            .fold(0, |mask, r| mask | r.mask)
    }

    fn release_all(&mut self) {
        for rule in self.rules.values_mut() {
            rule.active = false;
        }
    }
}

struct Emitter<'a, F> {
    listeners: &'a mut ListenerTable<PlayerEvent>,
    sink: F,
}

impl<F: FnMut(&PlayerEvent)> Emitter<'_, F> {
    fn emit(&mut self, event: PlayerEvent) {
        log::trace!(
            "player {} bit {:#06x} {} state={:#06x}",
            event.player,
            event.button,
            u8::from(event.value),
            event.state
        );
        self.listeners.dispatch(&event);
        (self.sink)(&event);
    }
}

/// Maps canonical events onto logical players through per-device templates.
#[derive(Debug)]
pub struct Mapper {
    config: MapperConfig,
    templates: TemplateStore,
    devices: AHashMap<DeviceId, MappedDevice>,
    /// Index 0 is the aggregate.
    players: Vec<LogicalMask>,
    listeners: ListenerTable<PlayerEvent>,
}

impl Default for Mapper {
    fn default() -> Self {
        Self::new(MapperConfig::default(), TemplateStore::default())
    }
}

impl Mapper {
    pub fn new(config: MapperConfig, templates: TemplateStore) -> Self {
        let count = config.clamped_players();
        Self {
            config: MapperConfig {
                players: count,
                ..config
            },
            templates,
            devices: AHashMap::new(),
            players: vec![0; count + 1],
            listeners: ListenerTable::new(),
        }
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    pub fn templates_mut(&mut self) -> &mut TemplateStore {
        &mut self.templates
    }

    /// Subscribe to player events.
    pub fn subscribe<F>(&mut self, callback: F) -> Result<ListenerId>
    where
        F: FnMut(&PlayerEvent) -> ControlFlow<()> + 'static,
    {
        Ok(self.listeners.subscribe(callback)?)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len() - 1
    }

    /// State of a player, `None` past the configured count.
    pub fn get_player_state(&self, player: usize) -> Option<LogicalMask> {
        self.players.get(player).copied()
    }

    /// Whether a connected device drives `player`. For the aggregate, whether
    /// any player is driven.
    pub fn is_player_mapped(&self, player: usize) -> bool {
        if player > self.player_count() {
            return false;
        }
        self.devices.values().any(|d| {
            if player == AGGREGATE_PLAYER {
                d.player != 0
            } else {
                d.player == player
            }
        })
    }

    /// Player a device is assigned to, zero while unassigned.
    pub fn device_player(&self, device: DeviceId) -> Option<usize> {
        self.devices.get(&device).map(|d| d.player)
    }

    /// First stored template matching the device, or a generated one which
    /// is appended to the store.
    pub fn resolve_template(
        &mut self,
        info: &DeviceInfo,
        compounds: &[CompoundControl],
        plain_buttons: &[ButtonId],
    ) -> Template {
        if let Some(template) = self.templates.find(info) {
            log::debug!("device {} matched a stored template", info.id);
            return template.clone();
        }
        let template = generate_template(&self.config, info, compounds, plain_buttons);
        self.templates.push(template.clone());
        template
    }

    pub fn apply_template(&mut self, device: DeviceId, template: &Template) -> bool {
        self.apply_template_with(device, template, |_| {})
    }

    /// Copy the template's rules into the device. Later changes to the
    /// template store do not affect it. Returns false for unknown devices.
    pub fn apply_template_with<F: FnMut(&PlayerEvent)>(
        &mut self,
        device: DeviceId,
        template: &Template,
        sink: F,
    ) -> bool {
        let Some(mapped) = self.devices.get_mut(&device) else {
            return false;
        };
        let was_active = mapped.mask() != 0;
        mapped.rules = template
            .rules()
            .iter()
            .map(|r| (r.key(), ActiveRule { mask: r.mask, active: false }))
            .collect();
        let player = mapped.player;
        if was_active {
            let mut out = Emitter {
                listeners: &mut self.listeners,
                sink,
            };
            refresh_player(&self.devices, &mut self.players, player, &mut out);
        }
        true
    }

    pub fn on_canonical_event(&mut self, event: &CanonicalEvent) {
        self.on_canonical_event_with(event, |_| {});
    }

    /// Apply a canonical event. Every produced player event goes to the
    /// listeners, then to `sink`.
    pub fn on_canonical_event_with<F: FnMut(&PlayerEvent)>(
        &mut self,
        event: &CanonicalEvent,
        sink: F,
    ) {
        let mut out = Emitter {
            listeners: &mut self.listeners,
            sink,
        };
        if event.is_connect() {
            if self.devices.contains_key(&event.device) {
                disconnect(&mut self.devices, &mut self.players, event.device, &mut out);
            }
            if event.value {
                log::debug!("mapping device {}", event.device);
                self.devices
                    .insert(event.device, MappedDevice::new(event.device));
            }
            return;
        }

        let key = (event.button, event.part);
        let assigned = match self.devices.get(&event.device) {
            Some(d) if d.rules.get(&key).is_some_and(|r| r.active != event.value) => {
                d.player
            }
            _ => return,
        };
        // Unassigned devices have no active rules, so this is a press.
        let player = if assigned == 0 {
            let player = least_loaded_player(&self.devices, self.players.len() - 1);
            log::debug!("device {} assigned to player {player}", event.device);
            player
        } else {
            assigned
        };
        if let Some(device) = self.devices.get_mut(&event.device) {
            device.player = player;
            if let Some(rule) = device.rules.get_mut(&key) {
                rule.active = event.value;
            }
        }
        refresh_player(&self.devices, &mut self.players, player, &mut out);
    }

    pub fn set_player_count(&mut self, count: usize) -> usize {
        self.set_player_count_with(count, |_| {})
    }

    /// Resize the player table, clamped to `1..=MAX_PLAYERS`. Shrinking
    /// releases the removed players and unassigns their devices. Returns
    /// the applied count.
    pub fn set_player_count_with<F: FnMut(&PlayerEvent)>(
        &mut self,
        count: usize,
        sink: F,
    ) -> usize {
        let count = count.clamp(1, MAX_PLAYERS);
        let current = self.player_count();
        if count < current {
            let mut out = Emitter {
                listeners: &mut self.listeners,
                sink,
            };
            for player in count + 1..=current {
                set_state(&mut self.players, player, 0, &mut out);
            }
            for device in self.devices.values_mut().filter(|d| d.player > count) {
                device.player = 0;
                device.release_all();
            }
            self.players.truncate(count + 1);
            refresh_aggregate(&mut self.players, &mut out);
        } else {
            self.players.resize(count + 1, 0);
        }
        self.config.players = count;
        count
    }
}

fn disconnect<F: FnMut(&PlayerEvent)>(
    devices: &mut AHashMap<DeviceId, MappedDevice>,
    players: &mut [LogicalMask],
    id: DeviceId,
    out: &mut Emitter<'_, F>,
) {
    let Some(device) = devices.get_mut(&id) else {
        return;
    };
    device.release_all();
    let player = device.player;
    refresh_player(devices, players, player, out);
    devices.remove(&id);
    log::debug!("device {id} unmapped");
}

/// Lowest player id with the fewest assigned platform devices.
fn least_loaded_player(devices: &AHashMap<DeviceId, MappedDevice>, count: usize) -> usize {
    let mut load = [0usize; MAX_PLAYERS + 1];
    for device in devices.values().filter(|d| !d.synthetic) {
        if let Some(slot) = load.get_mut(device.player) {
            *slot += 1;
        }
    }
    (1..=count).min_by_key(|&p| (load[p], p)).unwrap_or(1)
}

/// Recompute a player from its devices, then the aggregate.
fn refresh_player<F: FnMut(&PlayerEvent)>(
    devices: &AHashMap<DeviceId, MappedDevice>,
    players: &mut [LogicalMask],
    player: usize,
    out: &mut Emitter<'_, F>,
) {
    if player == AGGREGATE_PLAYER || player >= players.len() {
        return;
    }
    let state = devices
        .values()
        .filter(|d| d.player == player)
        .fold(0, |mask, d| mask | d.mask());
    set_state(players, player, state, out);
    refresh_aggregate(players, out);
}

fn refresh_aggregate<F: FnMut(&PlayerEvent)>(
    players: &mut [LogicalMask],
    out: &mut Emitter<'_, F>,
) {
    let union = players[1..].iter().fold(0, |mask, s| mask | s);
    set_state(players, AGGREGATE_PLAYER, union, out);
}

/// Move a player to `target`, one event per changed bit in ascending order.
fn set_state<F: FnMut(&PlayerEvent)>(
    players: &mut [LogicalMask],
    player: usize,
    target: LogicalMask,
    out: &mut Emitter<'_, F>,
) {
    let Some(state) = players.get_mut(player) else {
        return;
    };
    let changed = *state ^ target;
    for bit in 0..LOGICAL_BITS {
        let button: LogicalMask = 1 << bit;
        if changed & button == 0 {
            continue;
        }
        *state ^= button;
        let event = PlayerEvent {
            player,
            button,
            value: target & button != 0,
            state: *state,
        };
        out.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use joymap_input::{StandardRole, KEYBOARD_DEVICE_ID};

    use super::*;
    use crate::template::{ButtonRule, Matcher};

    fn press(device: DeviceId, button: ButtonId, value: bool) -> CanonicalEvent {
        CanonicalEvent::new(device, button, Part::Button, value)
    }

    fn buttons_template(rules: &[(ButtonId, LogicalMask)]) -> Template {
        let mut template = Template::new(Matcher::default());
        for &(source, mask) in rules {
            template.insert(ButtonRule::new(source, Part::Button, mask));
        }
        template
    }

    fn connect(mapper: &mut Mapper, device: DeviceId, template: &Template) {
        mapper.on_canonical_event(&CanonicalEvent::connect(device, true));
        assert!(mapper.apply_template(device, template));
    }

    fn collect(mapper: &mut Mapper, event: &CanonicalEvent) -> Vec<PlayerEvent> {
        let mut seen = Vec::new();
        mapper.on_canonical_event_with(event, |e| seen.push(*e));
        seen
    }

    fn ev(player: usize, button: LogicalMask, value: bool, state: LogicalMask) -> PlayerEvent {
        PlayerEvent {
            player,
            button,
            value,
            state,
        }
    }

    #[test]
    fn standard_south_press_reaches_player_and_aggregate() {
        let mut config = MapperConfig::unbound(4);
        config.bind(0, StandardRole::South);
        let mut mapper = Mapper::new(config, TemplateStore::default());
        let info = DeviceInfo {
            id: 5,
            name: "Pad".into(),
            standard_mapping: true,
            ..Default::default()
        };
        mapper.on_canonical_event(&CanonicalEvent::connect(5, true));
        let template = mapper.resolve_template(&info, &[], &[]);
        mapper.apply_template(5, &template);

        let south = StandardRole::South.button_id();
        assert_eq!(
            collect(&mut mapper, &press(5, south, true)),
            vec![ev(1, 0x0001, true, 0x0001), ev(0, 0x0001, true, 0x0001)]
        );
        assert_eq!(mapper.get_player_state(1), Some(0x0001));
        assert_eq!(mapper.templates().len(), 1);
    }

    #[test]
    fn players_are_assigned_least_loaded_lowest_first() {
        let mut mapper = Mapper::default();
        let template = buttons_template(&[(1, 1)]);
        for device in [10, 11, 12] {
            connect(&mut mapper, device, &template);
            assert_eq!(mapper.device_player(device), Some(0));
            mapper.on_canonical_event(&press(device, 1, true));
        }
        assert_eq!(mapper.device_player(10), Some(1));
        assert_eq!(mapper.device_player(11), Some(2));
        assert_eq!(mapper.device_player(12), Some(3));

        mapper.on_canonical_event(&CanonicalEvent::connect(11, false));
        assert!(!mapper.is_player_mapped(2));
        connect(&mut mapper, 13, &template);
        mapper.on_canonical_event(&press(13, 1, true));
        assert_eq!(mapper.device_player(13), Some(2));
    }

    #[test]
    fn release_on_unassigned_device_does_not_assign() {
        let mut mapper = Mapper::default();
        connect(&mut mapper, 1, &buttons_template(&[(1, 1)]));
        mapper.on_canonical_event(&press(1, 1, false));
        assert_eq!(mapper.device_player(1), Some(0));
        assert!(!mapper.is_player_mapped(AGGREGATE_PLAYER));
    }

    #[test]
    fn synthetic_devices_do_not_count_as_load() {
        let mut mapper = Mapper::default();
        let template = buttons_template(&[(1, 1)]);
        connect(&mut mapper, KEYBOARD_DEVICE_ID, &template);
        mapper.on_canonical_event(&press(KEYBOARD_DEVICE_ID, 1, true));
        connect(&mut mapper, 20, &template);
        mapper.on_canonical_event(&press(20, 1, true));
        assert_eq!(mapper.device_player(KEYBOARD_DEVICE_ID), Some(1));
        assert_eq!(mapper.device_player(20), Some(1));
    }

    #[test]
    fn two_controls_on_one_bit_do_not_release_each_other() {
        let mut mapper = Mapper::default();
        connect(&mut mapper, 1, &buttons_template(&[(1, 0b1), (2, 0b1)]));
        mapper.on_canonical_event(&press(1, 1, true));
        assert!(collect(&mut mapper, &press(1, 2, true)).is_empty());
        assert!(collect(&mut mapper, &press(1, 1, false)).is_empty());
        assert_eq!(
            collect(&mut mapper, &press(1, 2, false)),
            vec![ev(1, 0b1, false, 0), ev(0, 0b1, false, 0)]
        );
    }

    #[test]
    fn multi_bit_rules_emit_ascending_with_progressive_state() {
        let mut mapper = Mapper::default();
        connect(&mut mapper, 1, &buttons_template(&[(1, 0b101)]));
        assert_eq!(
            collect(&mut mapper, &press(1, 1, true)),
            vec![
                ev(1, 0b001, true, 0b001),
                ev(1, 0b100, true, 0b101),
                ev(0, 0b001, true, 0b001),
                ev(0, 0b100, true, 0b101),
            ]
        );
    }

    #[test]
    fn aggregate_only_changes_on_union_edges() {
        let mut mapper = Mapper::default();
        let template = buttons_template(&[(1, 0b1)]);
        connect(&mut mapper, 1, &template);
        connect(&mut mapper, 2, &template);
        mapper.on_canonical_event(&press(1, 1, true));
        assert_eq!(
            collect(&mut mapper, &press(2, 1, true)),
            vec![ev(2, 0b1, true, 0b1)]
        );
        assert_eq!(
            collect(&mut mapper, &press(1, 1, false)),
            vec![ev(1, 0b1, false, 0)]
        );
        assert_eq!(mapper.get_player_state(AGGREGATE_PLAYER), Some(0b1));
    }

    #[test]
    fn disconnect_releases_before_removal() {
        let mut mapper = Mapper::default();
        connect(&mut mapper, 1, &buttons_template(&[(1, 0b01), (2, 0b10)]));
        mapper.on_canonical_event(&press(1, 1, true));
        mapper.on_canonical_event(&press(1, 2, true));
        let events = collect(&mut mapper, &CanonicalEvent::connect(1, false));
        assert_eq!(
            events,
            vec![
                ev(1, 0b01, false, 0b10),
                ev(1, 0b10, false, 0),
                ev(0, 0b01, false, 0b10),
                ev(0, 0b10, false, 0),
            ]
        );
        assert_eq!(mapper.device_player(1), None);
        assert!(collect(&mut mapper, &press(1, 1, true)).is_empty());
    }

    #[test]
    fn unknown_rules_and_devices_are_ignored() {
        let mut mapper = Mapper::default();
        connect(&mut mapper, 1, &buttons_template(&[(1, 1)]));
        assert!(collect(&mut mapper, &press(1, 99, true)).is_empty());
        assert!(collect(&mut mapper, &press(42, 1, true)).is_empty());
        assert!(collect(&mut mapper, &CanonicalEvent::connect(42, false)).is_empty());
    }

    #[test]
    fn shrinking_players_releases_and_unassigns() {
        let mut mapper = Mapper::default();
        let template = buttons_template(&[(1, 0b1)]);
        for device in [1, 2, 3] {
            connect(&mut mapper, device, &template);
            mapper.on_canonical_event(&press(device, 1, true));
        }
        let mut seen = Vec::new();
        assert_eq!(mapper.set_player_count_with(2, |e| seen.push(*e)), 2);
        assert_eq!(seen, vec![ev(3, 0b1, false, 0)]);
        assert_eq!(mapper.get_player_state(3), None);
        assert_eq!(mapper.device_player(3), Some(0));
        assert!(!mapper.is_player_mapped(3));

        // Released state does not come back on the next release.
        assert!(collect(&mut mapper, &press(3, 1, false)).is_empty());
        assert_eq!(mapper.set_player_count(0), 1);
        assert_eq!(mapper.set_player_count(100), MAX_PLAYERS);
        assert_eq!(mapper.get_player_state(MAX_PLAYERS), Some(0));
    }

    #[test]
    fn reconnecting_a_multi_line_name_reuses_its_template() {
        let mut mapper = Mapper::default();
        let info = DeviceInfo {
            id: 7,
            vendor_id: 0x45e,
            name: "Pad\nX".into(),
            standard_mapping: true,
            ..Default::default()
        };
        for _ in 0..3 {
            mapper.on_canonical_event(&CanonicalEvent::connect(7, true));
            let template = mapper.resolve_template(&info, &[], &[]);
            assert!(mapper.apply_template(7, &template));
            mapper.on_canonical_event(&CanonicalEvent::connect(7, false));
        }
        assert_eq!(mapper.templates().len(), 1);
    }

    #[test]
    fn applied_rules_are_copied() {
        let mut mapper = Mapper::default();
        let mut template = buttons_template(&[(1, 0b1)]);
        connect(&mut mapper, 1, &template);
        template.insert(ButtonRule::new(2, Part::Button, 0b10));
        assert!(collect(&mut mapper, &press(1, 2, true)).is_empty());
    }

    #[test]
    fn listeners_run_before_sink_and_can_leave() {
        let mut mapper = Mapper::default();
        let order = Rc::new(RefCell::new(Vec::new()));
        let seen = order.clone();
        mapper
            .subscribe(move |e: &PlayerEvent| {
                seen.borrow_mut().push(format!("listener {}", e.player));
                ControlFlow::Break(())
            })
            .expect("capacity");
        connect(&mut mapper, 1, &buttons_template(&[(1, 1)]));
        let sink = order.clone();
        mapper.on_canonical_event_with(&press(1, 1, true), |e| {
            sink.borrow_mut().push(format!("sink {}", e.player));
        });
        assert_eq!(
            *order.borrow(),
            vec!["listener 1", "sink 1", "sink 0"]
        );
    }
}
