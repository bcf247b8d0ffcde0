//! Dependency graph construction.
//!
//! [`DependencyGraphBuilder`] turns the instruction list of one block into a
//! [`DependencyGraph`]. Hazards are found with last-writer tables, one slot
//! per tracked resource:
//!
//! | Resource | Before allocation | After allocation |
//! |----------|-------------------|------------------|
//! | general registers | one slot per register of each virtual register (scalar) or per virtual register (vec4) | one slot per physical register |
//! | fixed hardware registers | one shared slot | the physical register slots |
//! | message registers | one slot per register | one slot per register |
//! | flag | one slot per subregister | one slot per subregister |
//! | accumulator | one slot | one slot |
//!
//! A forward walk adds read-after-write and write-after-write edges; a
//! backward walk over fresh tables adds write-after-read edges. Barrier
//! instructions are ordered against every other instruction of the block;
//! their edges stop at the neighbouring barriers, which already order
//! everything beyond them.

use std::fmt;

use crate::{
    ir::{Instruction, Operand, RegRef, RegisterFile},
    schedule::{
        AllocationMode, DependencyGraph, Latency, LatencyModel, SchedulerConfig,
        VirtualGranularity,
    },
    utils::graph::NodeId,
    Result,
};

/// Size of the message register file.
pub const MRF_COUNT: usize = 16;

/// Number of flag subregisters.
pub const FLAG_SUBREGS: usize = 2;

/// Latency of a write-after-read edge on a message register. The payload
/// is consumed when the send issues, not when its result returns.
const MRF_WAR_LATENCY: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resource {
    Grf(usize),
    AnyFixed,
    Mrf(usize),
    Flag(usize),
    Accumulator,
}

/// How a read is ordered against a later write of the same resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadKind {
    Operand,
    Payload,
}

/// How a write is ordered against an earlier write of the same resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteKind {
    Result,
    Flag,
}

/// Resolved resource accesses of one instruction.
#[derive(Debug, Default)]
struct Access {
    reads: Vec<(Resource, ReadKind)>,
    writes: Vec<(Resource, WriteKind)>,
    unmodeled: bool,
}

#[derive(Debug, Clone)]
struct LastWriters {
    grf: Vec<Option<NodeId>>,
    any_fixed: Option<NodeId>,
    mrf: [Option<NodeId>; MRF_COUNT],
    flag: [Option<NodeId>; FLAG_SUBREGS],
    accumulator: Option<NodeId>,
}

impl LastWriters {
    fn new(grf_slots: usize) -> Self {
        LastWriters {
            grf: vec![None; grf_slots],
            any_fixed: None,
            mrf: [None; MRF_COUNT],
            flag: [None; FLAG_SUBREGS],
            accumulator: None,
        }
    }

    fn slot(&mut self, resource: Resource) -> &mut Option<NodeId> {
        match resource {
            Resource::Grf(slot) => &mut self.grf[slot],
            Resource::AnyFixed => &mut self.any_fixed,
            Resource::Mrf(nr) => &mut self.mrf[nr],
            Resource::Flag(subreg) => &mut self.flag[subreg],
            Resource::Accumulator => &mut self.accumulator,
        }
    }
}

/// Why a node was serialized against the rest of its block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierReason {
    /// The instruction has side effects.
    SideEffects,
    /// Shader-exit placeholder.
    ShaderExit,
    /// Control flow at a block boundary.
    ControlFlow,
    /// An operand without a dependency model.
    UnmodeledOperand,
}

impl fmt::Display for BarrierReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            BarrierReason::SideEffects => "side effects",
            BarrierReason::ShaderExit => "shader exit",
            BarrierReason::ControlFlow => "control flow at block boundary",
            BarrierReason::UnmodeledOperand => "unmodeled operand",
        };
        f.write_str(reason)
    }
}

/// Side information gathered while building a graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Serialized nodes, in program order.
    pub barriers: Vec<(NodeId, BarrierReason)>,
}

impl BuildReport {
    /// Number of nodes serialized because of unmodeled operands.
    #[must_use]
    pub fn unmodeled_count(&self) -> usize {
        self.barriers
            .iter()
            .filter(|(_, reason)| *reason == BarrierReason::UnmodeledOperand)
            .count()
    }
}

/// Builds dependency graphs for the blocks of one shader.
///
/// # Examples
///
/// ```rust
/// use gensched::ir::{Instruction, Opcode, Operand};
/// use gensched::schedule::{DependencyGraphBuilder, LatencyModel, SchedulerConfig};
/// use gensched::utils::graph::NodeId;
///
/// let config = SchedulerConfig::default();
/// let model = LatencyModel::for_config(&config);
/// let sizes = [1, 1];
///
/// let block = vec![
///     Instruction::build(Opcode::Mov).dst(Operand::vgrf(0, 0)).src0(Operand::Immediate(1)).build(),
///     Instruction::build(Opcode::Mov).dst(Operand::vgrf(1, 0)).src0(Operand::vgrf(0, 0)).build(),
/// ];
///
/// let graph = DependencyGraphBuilder::new(&config, &model, &sizes).build(&block)?;
/// assert!(graph.has_edge(NodeId::new(0), NodeId::new(1)));
/// # Ok::<(), gensched::Error>(())
/// ```
#[derive(Debug)]
pub struct DependencyGraphBuilder<'c> {
    config: &'c SchedulerConfig,
    model: &'c LatencyModel,
    vreg_sizes: &'c [u32],
    /// First slot of each virtual register in the scalar slot layout.
    vreg_base: Vec<usize>,
    grf_slots: usize,
}

impl<'c> DependencyGraphBuilder<'c> {
    /// Creates a builder. `vreg_sizes` holds the size in registers of each
    /// virtual register and is ignored after allocation.
    #[must_use]
    pub fn new(config: &'c SchedulerConfig, model: &'c LatencyModel, vreg_sizes: &'c [u32]) -> Self {
        let mut vreg_base = Vec::with_capacity(vreg_sizes.len());
        let mut next = 0usize;
        for &size in vreg_sizes {
            vreg_base.push(next);
            next += size as usize;
        }

        let grf_slots = match (config.mode, config.flavor.virtual_granularity()) {
            (AllocationMode::PostAllocation, _) => config.budget.total_registers as usize,
            (AllocationMode::PreAllocation, VirtualGranularity::PerRegister) => next,
            (AllocationMode::PreAllocation, VirtualGranularity::PerVirtualRegister) => {
                vreg_sizes.len()
            }
        };

        DependencyGraphBuilder {
            config,
            model,
            vreg_sizes,
            vreg_base,
            grf_slots,
        }
    }

    /// Builds the dependency graph of `instructions` with critical-path
    /// delays computed for the configured direction and mode.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if an operand lies outside the
    /// register files or the size table, or names a register file that does
    /// not exist in the configured mode.
    pub fn build<'a>(&self, instructions: &'a [Instruction]) -> Result<DependencyGraph<'a>> {
        self.build_with_report(instructions).map(|(graph, _)| graph)
    }

    /// Like [`build`](Self::build), also returning which nodes were
    /// serialized and why.
    ///
    /// # Errors
    ///
    /// See [`build`](Self::build).
    pub fn build_with_report<'a>(
        &self,
        instructions: &'a [Instruction],
    ) -> Result<(DependencyGraph<'a>, BuildReport)> {
        let accesses = instructions
            .iter()
            .enumerate()
            .map(|(index, inst)| self.resolve(index, inst))
            .collect::<Result<Vec<_>>>()?;

        let mut graph = DependencyGraph::with_capacity(instructions.len());
        for inst in instructions {
            graph.add_node(inst, self.model.issue_cycles(inst), self.model.latency(inst));
        }

        let report = Self::add_barrier_deps(&mut graph, instructions, &accesses);
        self.add_forward_deps(&mut graph, &accesses);
        self.add_backward_deps(&mut graph, &accesses);

        graph.compute_delays(self.config.direction(), self.config.uses_physical_latency())?;
        Ok((graph, report))
    }

    /// Orders every barrier after all earlier nodes and before all later
    /// nodes.
    ///
    /// Edges only span the nodes up to the previous and next barrier, so a
    /// block of `n` instructions gets `O(n)` barrier edges.
    fn add_barrier_deps(
        graph: &mut DependencyGraph<'_>,
        instructions: &[Instruction],
        accesses: &[Access],
    ) -> BuildReport {
        let count = instructions.len();
        let barriers: Vec<(NodeId, BarrierReason)> = instructions
            .iter()
            .zip(accesses)
            .enumerate()
            .filter_map(|(index, (inst, access))| {
                let reason = if access.unmodeled {
                    BarrierReason::UnmodeledOperand
                } else if inst.has_side_effects() {
                    BarrierReason::SideEffects
                } else if inst.is_barrier() {
                    BarrierReason::ShaderExit
                } else if inst.is_control_flow() && (index == 0 || index + 1 == count) {
                    BarrierReason::ControlFlow
                } else {
                    return None;
                };
                Some((NodeId::new(index), reason))
            })
            .collect();

        for (pos, &(id, _)) in barriers.iter().enumerate() {
            let index = id.index();
            let first = pos
                .checked_sub(1)
                .map_or(0, |prev| barriers[prev].0.index());
            let last = barriers
                .get(pos + 1)
                .map_or(count, |(next, _)| next.index() + 1);

            for earlier in first..index {
                let from = NodeId::new(earlier);
                let latency = graph.node(from).latency();
                graph.insert_edge(from, id, latency);
            }
            let latency = graph.node(id).latency();
            for later in index + 1..last {
                graph.insert_edge(id, NodeId::new(later), latency);
            }
        }
        BuildReport { barriers }
    }

    /// Read-after-write and write-after-write edges.
    fn add_forward_deps(&self, graph: &mut DependencyGraph<'_>, accesses: &[Access]) {
        let mut last = LastWriters::new(self.grf_slots);

        for (index, access) in accesses.iter().enumerate() {
            let id = NodeId::new(index);

            for &(resource, _) in &access.reads {
                if let Some(writer) = *last.slot(resource) {
                    let latency = graph.node(writer).latency();
                    Self::add_dep(graph, writer, id, latency);
                }
            }

            for &(resource, kind) in &access.writes {
                let slot = last.slot(resource);
                if let Some(writer) = slot.replace(id) {
                    let latency = match kind {
                        WriteKind::Result => graph.node(writer).latency(),
                        WriteKind::Flag => Latency::uniform(0),
                    };
                    Self::add_dep(graph, writer, id, latency);
                }
            }
        }
    }

    /// Write-after-read edges.
    fn add_backward_deps(&self, graph: &mut DependencyGraph<'_>, accesses: &[Access]) {
        let mut next = LastWriters::new(self.grf_slots);

        for (index, access) in accesses.iter().enumerate().rev() {
            let id = NodeId::new(index);

            for &(resource, kind) in &access.reads {
                if let Some(writer) = *next.slot(resource) {
                    let latency = match kind {
                        ReadKind::Operand => 0,
                        ReadKind::Payload => MRF_WAR_LATENCY,
                    };
                    Self::add_dep(graph, id, writer, Latency::uniform(latency));
                }
            }

            for &(resource, _) in &access.writes {
                *next.slot(resource) = Some(id);
            }
        }
    }

    fn add_dep(graph: &mut DependencyGraph<'_>, from: NodeId, to: NodeId, latency: Latency) {
        if from == to {
            return;
        }
        debug_assert!(from < to, "dependency {from} -> {to} points backwards");
        graph.insert_edge(from, to, latency);
    }

    /// Resolves every operand of `inst` to tracked resources.
    fn resolve(&self, index: usize, inst: &Instruction) -> Result<Access> {
        let mut access = Access {
            unmodeled: inst.touches_unmodeled(),
            ..Access::default()
        };

        for src in inst.sources() {
            if let Operand::Register(reg) = src {
                for resource in self.resources(index, reg)? {
                    access.reads.push((resource, ReadKind::Operand));
                }
            }
        }
        for mrf in inst.payload_mrfs() {
            let nr = self.mrf_index(index, mrf)?;
            access.reads.push((Resource::Mrf(nr), ReadKind::Payload));
        }
        if inst.reads_flag() {
            let subreg = self.flag_index(index, inst)?;
            access.reads.push((Resource::Flag(subreg), ReadKind::Operand));
        }
        if inst.reads_accumulator_implicitly() {
            access.reads.push((Resource::Accumulator, ReadKind::Operand));
        }

        if let Operand::Register(reg) = &inst.dst {
            for resource in self.resources(index, reg)? {
                access.writes.push((resource, WriteKind::Result));
            }
        }
        for mrf in inst.implied_mrfs() {
            let nr = self.mrf_index(index, mrf)?;
            access.writes.push((Resource::Mrf(nr), WriteKind::Result));
        }
        if inst.writes_flag() {
            let subreg = self.flag_index(index, inst)?;
            access.writes.push((Resource::Flag(subreg), WriteKind::Flag));
        }
        if inst.writes_accumulator() {
            access.writes.push((Resource::Accumulator, WriteKind::Result));
        }

        Ok(access)
    }

    fn resources(&self, index: usize, reg: &RegRef) -> Result<Vec<Resource>> {
        let regs = reg.regs.max(1);
        let mode = self.config.mode;

        match (reg.file, mode) {
            (RegisterFile::Virtual, AllocationMode::PreAllocation) => {
                let nr = reg.nr as usize;
                let Some(&size) = self.vreg_sizes.get(nr) else {
                    return Err(malformed_error!(
                        "instruction {} references vgrf{} but only {} virtual registers exist",
                        index,
                        reg.nr,
                        self.vreg_sizes.len()
                    ));
                };
                if reg.offset.checked_add(regs).map_or(true, |end| end > size) {
                    return Err(malformed_error!(
                        "instruction {} accesses vgrf{}.{}<{}> beyond its size of {}",
                        index,
                        reg.nr,
                        reg.offset,
                        regs,
                        size
                    ));
                }
                Ok(match self.config.flavor.virtual_granularity() {
                    VirtualGranularity::PerRegister => {
                        let base = self.vreg_base[nr] + reg.offset as usize;
                        (base..base + regs as usize).map(Resource::Grf).collect()
                    }
                    VirtualGranularity::PerVirtualRegister => vec![Resource::Grf(nr)],
                })
            }
            (RegisterFile::FixedGeneral, AllocationMode::PreAllocation) => {
                Ok(vec![Resource::AnyFixed])
            }
            (RegisterFile::General | RegisterFile::FixedGeneral, AllocationMode::PostAllocation) => {
                let end = (reg.nr as usize).checked_add(regs as usize);
                let Some(end) = end.filter(|&end| end <= self.grf_slots) else {
                    return Err(malformed_error!(
                        "instruction {} accesses g{}<{}> beyond the {}-register file",
                        index,
                        reg.nr,
                        regs,
                        self.grf_slots
                    ));
                };
                Ok((reg.nr as usize..end).map(Resource::Grf).collect())
            }
            (RegisterFile::Message, _) => {
                let base = u64::from(reg.nr);
                (base..base + u64::from(regs))
                    .map(|nr| self.mrf_index(index, nr).map(Resource::Mrf))
                    .collect()
            }
            (RegisterFile::Accumulator, _) => Ok(vec![Resource::Accumulator]),
            (RegisterFile::Virtual, AllocationMode::PostAllocation) => Err(malformed_error!(
                "instruction {} references vgrf{} after register allocation",
                index,
                reg.nr
            )),
            (RegisterFile::General, AllocationMode::PreAllocation) => Err(malformed_error!(
                "instruction {} references allocated register g{} before register allocation",
                index,
                reg.nr
            )),
        }
    }

    fn mrf_index(&self, index: usize, nr: u64) -> Result<usize> {
        match usize::try_from(nr) {
            Ok(nr) if nr < MRF_COUNT => Ok(nr),
            _ => Err(malformed_error!(
                "instruction {} accesses m{} beyond the {}-register message file",
                index,
                nr,
                MRF_COUNT
            )),
        }
    }

    fn flag_index(&self, index: usize, inst: &Instruction) -> Result<usize> {
        let subreg = inst.flag_subreg as usize;
        if subreg >= FLAG_SUBREGS {
            return Err(malformed_error!(
                "instruction {} uses flag subregister f0.{} of {}",
                index,
                subreg,
                FLAG_SUBREGS
            ));
        }
        Ok(subreg)
    }
}
