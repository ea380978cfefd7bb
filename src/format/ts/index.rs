use super::types::{Packet, PidStream, PidSummary};
use std::collections::BTreeMap;

/// PID → packets mapping built by one scan pass.
///
/// Keys iterate in ascending PID order, so listings are deterministic
/// regardless of the order PIDs first appeared in the stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamIndex {
    streams: BTreeMap<u16, PidStream>,
}

impl StreamIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `packet` to the stream for `pid`, creating it on first sight.
    pub(crate) fn insert(&mut self, pid: u16, packet: Packet) {
        let stream = self
            .streams
            .entry(pid)
            .or_insert_with(|| PidStream::new(pid));
        stream.packet_count += 1;
        stream.packets.push(packet);
    }

    pub fn lookup(&self, pid: u16) -> Option<&PidStream> {
        self.streams.get(&pid)
    }

    pub fn list(&self) -> Vec<PidSummary> {
        self.streams
            .values()
            .map(|s| PidSummary {
                pid: s.pid,
                packet_count: s.packet_count,
            })
            .collect()
    }

    pub fn pids(&self) -> impl Iterator<Item = u16> + '_ {
        self.streams.keys().copied()
    }

    pub fn streams(&self) -> impl Iterator<Item = &PidStream> {
        self.streams.values()
    }

    /// Total packets across all PIDs.
    pub fn packet_count(&self) -> u64 {
        self.streams.values().map(|s| s.packet_count).sum()
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}
