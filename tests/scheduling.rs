//! Scheduling integration tests.
//!
//! These tests drive the public API end to end:
//! 1. Describe blocks with the `Instruction` builder
//! 2. Build dependency graphs with `DependencyGraphBuilder`
//! 3. Schedule blocks through `InstructionScheduler` and `Scheduler`
//! 4. Verify ordering, dependency and pressure properties of the result

use gensched::{
    ir::{Instruction, Opcode, Operand},
    schedule::{
        AllocationMode, DependencyGraph, DependencyGraphBuilder, Direction, EventKind, Flavor,
        Generation, InstructionScheduler, Latency, LatencyModel, RegisterPressureTracker,
        Scheduler, SchedulerConfig, ScoreWeights, ShaderBlock,
    },
    utils::{graph::NodeId, BitSet},
    Error, Result,
};

/// Every mode, direction and flavor combination the scheduler supports.
fn all_configs() -> Vec<SchedulerConfig> {
    let mut configs = Vec::new();
    for generation in [5, 7, 9] {
        for direction in [Direction::TopDown, Direction::BottomUp] {
            configs.push(
                SchedulerConfig::pre_allocation(Generation::new(generation))
                    .with_direction(direction),
            );
            configs.push(
                SchedulerConfig::pre_allocation(Generation::new(generation))
                    .with_direction(direction)
                    .with_flavor(Flavor::Vec4),
            );
            configs.push(
                SchedulerConfig::post_allocation(Generation::new(generation))
                    .with_direction(direction),
            );
        }
    }
    configs
}

/// Register operand appropriate for the configuration's mode.
fn reg(config: &SchedulerConfig, nr: u32) -> Operand {
    match config.mode {
        AllocationMode::PreAllocation => Operand::vgrf(nr, 0),
        AllocationMode::PostAllocation => Operand::grf(nr),
    }
}

fn mov_imm(dst: Operand, imm: u32) -> Instruction {
    Instruction::build(Opcode::Mov)
        .dst(dst)
        .src0(Operand::Immediate(imm))
        .build()
}

fn scheduler(config: SchedulerConfig, vregs: usize) -> Result<InstructionScheduler> {
    Ok(InstructionScheduler::new(config)?.with_vreg_sizes(vec![1; vregs]))
}

#[test]
fn test_chain_keeps_program_order() -> Result<()> {
    for config in all_configs() {
        // A defines r1, B uses r1 and defines r2, C uses r2
        let block = vec![
            mov_imm(reg(&config, 1), 5),
            Instruction::build(Opcode::Add)
                .dst(reg(&config, 2))
                .src0(reg(&config, 1))
                .src1(Operand::Immediate(1))
                .build(),
            Instruction::build(Opcode::Mul)
                .dst(reg(&config, 3))
                .src0(reg(&config, 2))
                .src1(reg(&config, 2))
                .build(),
        ];

        let scheduled = scheduler(config.clone(), 4)?.schedule_block(&ShaderBlock::new(0, block))?;
        assert_eq!(scheduled.order, vec![0, 1, 2], "{config:?}");
    }
    Ok(())
}

#[test]
fn test_side_effect_stays_ahead_of_independent_work() -> Result<()> {
    for config in all_configs() {
        let block = vec![
            Instruction::build(Opcode::ScratchWrite)
                .src0(reg(&config, 0))
                .message(4, 1)
                .build(),
            mov_imm(reg(&config, 1), 1),
            mov_imm(reg(&config, 2), 2),
        ];

        let scheduled = scheduler(config.clone(), 3)?.schedule_block(&ShaderBlock::new(0, block))?;
        assert_eq!(scheduled.order[0], 0, "{config:?}");
        assert_eq!(scheduled.summary.barrier_count, 1);
    }
    Ok(())
}

#[test]
fn test_barrier_sandwich_is_serialized() -> Result<()> {
    for config in all_configs() {
        let block = vec![
            mov_imm(reg(&config, 0), 1),
            Instruction::build(Opcode::UntypedAtomic)
                .dst(reg(&config, 1))
                .message(2, 1)
                .build(),
            mov_imm(reg(&config, 2), 2),
        ];

        let model = LatencyModel::for_config(&config);
        let sizes = [1, 1, 1];
        let graph = DependencyGraphBuilder::new(&config, &model, &sizes).build(&block)?;
        assert!(graph.has_edge(NodeId::new(0), NodeId::new(1)));
        assert!(graph.has_edge(NodeId::new(1), NodeId::new(2)));

        let scheduled = scheduler(config.clone(), 3)?.schedule_block(&ShaderBlock::new(0, block))?;
        assert_eq!(scheduled.order, vec![0, 1, 2], "{config:?}");
    }
    Ok(())
}

#[test]
fn test_independent_instructions_have_no_edges() -> Result<()> {
    for config in all_configs() {
        let block: Vec<_> = (0..6).map(|nr| mov_imm(reg(&config, nr), nr)).collect();
        let model = LatencyModel::for_config(&config);
        let sizes = [1; 6];

        let graph = DependencyGraphBuilder::new(&config, &model, &sizes).build(&block)?;
        assert_eq!(graph.edge_count(), 0, "{config:?}");
    }
    Ok(())
}

#[test]
fn test_panic_mode_biases_towards_pressure() -> Result<()> {
    // v0 -> v1 -> v2 is the critical path; v3 is a short, independent def.
    // v2 and v3 are live out.
    let block = vec![
        mov_imm(Operand::vgrf(0, 0), 1),
        Instruction::build(Opcode::Add)
            .dst(Operand::vgrf(1, 0))
            .src0(Operand::vgrf(0, 0))
            .src1(Operand::vgrf(0, 0))
            .build(),
        Instruction::build(Opcode::Add)
            .dst(Operand::vgrf(2, 0))
            .src0(Operand::vgrf(1, 0))
            .src1(Operand::vgrf(1, 0))
            .build(),
        mov_imm(Operand::vgrf(3, 0), 2),
    ];
    let shader_block = ShaderBlock::new(0, block)
        .with_liveness(BitSet::new(4), BitSet::with_members(4, [2, 3]));

    let latency_only = ScoreWeights {
        delay: 1.0,
        pressure: 0.0,
        lifetime: 0.0,
        unblocked: 0.0,
        partial: 0.0,
    };
    let pressure_only = ScoreWeights {
        delay: 0.0,
        pressure: 1.0,
        lifetime: 0.0,
        unblocked: 0.0,
        partial: 0.0,
    };
    let base = SchedulerConfig::pre_allocation(Generation::new(7))
        .with_weights(latency_only)
        .with_panic_weights(pressure_only);

    // Plenty of registers: the critical path goes first, v3 is hoisted.
    let relaxed = scheduler(base.clone(), 4)?;
    let scheduled = relaxed.schedule_block(&shader_block)?;
    assert_eq!(scheduled.order, vec![0, 3, 1, 2]);
    assert_eq!(scheduled.summary.panic_picks, 0);
    assert!(!relaxed.events().has(EventKind::PanicModeEntered));

    // Two live registers against a limit of one: v3 is sunk to retire it.
    let tight = scheduler(base.with_budget(16, 2).with_panic_threshold(0.5), 4)?;
    let scheduled = tight.schedule_block(&shader_block)?;
    assert_eq!(scheduled.order, vec![0, 1, 2, 3]);
    assert_eq!(scheduled.summary.panic_picks, 1);
    assert!(tight.events().has(EventKind::PanicModeEntered));
    assert!(tight.events().has(EventKind::PanicModeLeft));
    Ok(())
}

#[test]
fn test_default_panic_weights_retire_registers_first() -> Result<()> {
    // v2 is a large register live across the block that keeps pressure
    // above the default limit. Bottom-up, v1's definition retires v1 while
    // the cmp makes v0 live.
    let block = vec![
        mov_imm(Operand::vgrf(0, 0), 1),
        mov_imm(Operand::vgrf(1, 0), 2),
        Instruction::build(Opcode::Cmp)
            .src0(Operand::vgrf(0, 0))
            .src1(Operand::Immediate(0))
            .writes_flag(0)
            .build(),
    ];
    let shader_block = ShaderBlock::new(0, block)
        .with_liveness(BitSet::new(3), BitSet::with_members(3, [1, 2]));

    let config = SchedulerConfig::pre_allocation(Generation::new(7));
    assert_eq!(config.panic_weights, ScoreWeights::panic());
    assert!(config.panic_limit() < 112.0);

    let scheduler = InstructionScheduler::new(config)?.with_vreg_sizes(vec![8, 8, 104]);
    let scheduled = scheduler.schedule_block(&shader_block)?;

    // v1's definition is picked first and lands last; v0's def and use are
    // picked under panic too.
    assert_eq!(scheduled.order, vec![0, 2, 1]);
    assert_eq!(scheduled.summary.panic_picks, 2);
    assert_eq!(scheduler.events().count_kind(EventKind::PanicModeEntered), 2);
    Ok(())
}

#[test]
fn test_long_side_effect_run_stays_linear() -> Result<()> {
    let count = 3000;
    let block: Vec<_> = (0..count)
        .map(|i| {
            Instruction::build(Opcode::Mov)
                .dst(Operand::grf(i % 64))
                .src0(Operand::Immediate(i))
                .side_effects()
                .build()
        })
        .collect();

    let scheduler = InstructionScheduler::new(SchedulerConfig::post_allocation(Generation::new(9)))?;
    let scheduled = scheduler.schedule_block(&ShaderBlock::new(0, block))?;

    assert!(scheduled.is_unchanged());
    assert_eq!(scheduled.summary.barrier_count, count as usize);
    assert_eq!(scheduled.summary.edge_count, 2 * count as usize - 65);
    Ok(())
}

/// Mixed block touching every resource class.
fn mixed_block() -> Vec<Instruction> {
    let v = |nr| Operand::vgrf(nr, 0);
    vec![
        mov_imm(v(0), 1),
        Instruction::build(Opcode::Cmp)
            .src0(v(0))
            .src1(Operand::Immediate(3))
            .writes_flag(0)
            .build(),
        Instruction::build(Opcode::Sqrt).dst(v(1)).src0(v(0)).build(),
        Instruction::build(Opcode::Sel)
            .dst(v(2))
            .src0(v(1))
            .src1(v(0))
            .reads_flag(0)
            .build(),
        Instruction::build(Opcode::Mov).dst(Operand::mrf(2)).src0(v(2)).build(),
        Instruction::build(Opcode::Mov).dst(Operand::mrf(3)).src0(v(0)).build(),
        Instruction::build(Opcode::Tex)
            .dst(v(3).spanning(4))
            .message(2, 2)
            .implied_mrf_writes(1)
            .build(),
        Instruction::build(Opcode::Mul)
            .dst(v(4))
            .src0(v(0))
            .src1(Operand::Uniform(0))
            .writes_accumulator()
            .build(),
        Instruction::build(Opcode::Mach)
            .dst(v(5))
            .src0(v(0))
            .src1(Operand::Uniform(1))
            .build(),
        Instruction::build(Opcode::Add)
            .dst(v(6))
            .src0(Operand::vgrf(3, 2))
            .src1(v(5))
            .build(),
        Instruction::build(Opcode::Mov).dst(Operand::mrf(2)).src0(v(6)).build(),
        Instruction::build(Opcode::Rcp).dst(v(0)).src0(v(4)).build(),
    ]
}

fn mixed_sizes() -> Vec<u32> {
    vec![1, 1, 1, 4, 1, 1, 1]
}

#[test]
fn test_dependencies_preserved_and_schedule_complete() -> Result<()> {
    let block = mixed_block();
    let sizes = mixed_sizes();

    for config in all_configs()
        .into_iter()
        .filter(|c| c.mode == AllocationMode::PreAllocation)
    {
        let model = LatencyModel::for_config(&config);
        let graph = DependencyGraphBuilder::new(&config, &model, &sizes).build(&block)?;
        graph.verify()?;

        let mut tracker = RegisterPressureTracker::new(&sizes);
        tracker.seed(&block, &BitSet::new(7), &BitSet::with_members(7, [0, 6]), config.direction());
        let schedule = Scheduler::new(&graph, &config, tracker).run()?;

        assert!(graph.is_order_valid(&schedule.order), "{config:?}");
        let mut seen: Vec<_> = schedule.order.iter().map(|id| id.index()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..block.len()).collect::<Vec<_>>());
    }
    Ok(())
}

#[test]
fn test_scheduling_is_deterministic() -> Result<()> {
    let blocks: Vec<_> = (0..4)
        .map(|index| {
            ShaderBlock::new(index, mixed_block())
                .with_liveness(BitSet::new(7), BitSet::with_members(7, [0, 6]))
        })
        .collect();

    for config in all_configs()
        .into_iter()
        .filter(|c| c.mode == AllocationMode::PreAllocation)
    {
        let scheduler = InstructionScheduler::new(config)?.with_vreg_sizes(mixed_sizes());
        let first = scheduler.schedule_blocks(&blocks)?;
        let second = scheduler.schedule_blocks(&blocks)?;

        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.order, b.order);
            assert_eq!(a.instructions, b.instructions);
            assert_eq!(a.summary, b.summary);
        }
    }
    Ok(())
}

#[test]
fn test_parallel_blocks_match_sequential() -> Result<()> {
    let config = SchedulerConfig::post_allocation(Generation::new(9));
    let scheduler = InstructionScheduler::new(config)?;

    let blocks: Vec<_> = (0..32u32)
        .map(|index| {
            let base = (index % 8) * 8;
            let block = vec![
                Instruction::build(Opcode::Txl)
                    .dst(Operand::grf(base).spanning(4))
                    .message(1 + index % 4, 2)
                    .build(),
                Instruction::build(Opcode::Add)
                    .dst(Operand::grf(base + 4))
                    .src0(Operand::grf(base))
                    .src1(Operand::grf(base + 1))
                    .build(),
                mov_imm(Operand::grf(base + 5), index),
                mov_imm(Operand::grf(base + 6), index + 1),
            ];
            ShaderBlock::new(index as usize, block)
        })
        .collect();

    let parallel = scheduler.schedule_blocks(&blocks)?;
    assert_eq!(parallel.len(), blocks.len());

    for (block, scheduled) in blocks.iter().zip(&parallel) {
        let sequential = scheduler.schedule_block(block)?;
        assert_eq!(scheduled.index, block.index);
        assert_eq!(scheduled.order, sequential.order);
        assert_eq!(scheduled.order, vec![0, 2, 3, 1]);
    }
    assert_eq!(
        scheduler.events().count_kind(EventKind::BlockScheduled),
        2 * blocks.len()
    );
    Ok(())
}

#[test]
fn test_post_allocation_hides_sampler_latency() -> Result<()> {
    let config = SchedulerConfig::post_allocation(Generation::new(7)).with_occupancy(1);
    let block = vec![
        Instruction::build(Opcode::Tex)
            .dst(Operand::grf(10).spanning(4))
            .message(2, 1)
            .build(),
        Instruction::build(Opcode::Add)
            .dst(Operand::grf(20))
            .src0(Operand::grf(10))
            .build(),
        mov_imm(Operand::grf(30), 0),
        mov_imm(Operand::grf(31), 0),
    ];

    let scheduled = scheduler(config, 0)?.schedule_block(&ShaderBlock::new(0, block))?;
    assert_eq!(scheduled.order, vec![0, 2, 3, 1]);
    // tex issues at 0..2, its result arrives at 202
    assert_eq!(scheduled.summary.physical_cycles, 204);
    assert_eq!(scheduled.summary.estimated_cycles, 204);
    Ok(())
}

#[test]
fn test_vec4_tracks_whole_virtual_registers() -> Result<()> {
    let block = vec![
        mov_imm(Operand::vgrf(0, 0), 1),
        mov_imm(Operand::vgrf(0, 1), 2),
        Instruction::build(Opcode::Dp4)
            .dst(Operand::vgrf(1, 0))
            .src0(Operand::vgrf(0, 0).spanning(2))
            .src1(Operand::Uniform(0))
            .build(),
    ];
    let sizes = [2, 1];

    let scalar = SchedulerConfig::pre_allocation(Generation::new(6));
    let vec4 = scalar.clone().with_flavor(Flavor::Vec4);

    let scalar_model = LatencyModel::for_config(&scalar);
    let vec4_model = LatencyModel::for_config(&vec4);
    let scalar_graph = DependencyGraphBuilder::new(&scalar, &scalar_model, &sizes).build(&block)?;
    let vec4_graph = DependencyGraphBuilder::new(&vec4, &vec4_model, &sizes).build(&block)?;

    // Scalar: each half feeds the dp4 on its own.
    assert!(scalar_graph.has_edge(NodeId::new(0), NodeId::new(2)));
    assert!(scalar_graph.has_edge(NodeId::new(1), NodeId::new(2)));
    assert!(!scalar_graph.has_edge(NodeId::new(0), NodeId::new(1)));

    // Vec4: the second half-write overwrites the whole register.
    assert!(vec4_graph.has_edge(NodeId::new(0), NodeId::new(1)));
    assert!(vec4_graph.has_edge(NodeId::new(1), NodeId::new(2)));
    assert!(!vec4_graph.has_edge(NodeId::new(0), NodeId::new(2)));

    let scheduled = InstructionScheduler::new(vec4)?
        .with_vreg_sizes(sizes.to_vec())
        .schedule_block(&ShaderBlock::new(0, block))?;
    assert_eq!(scheduled.order, vec![0, 1, 2]);
    Ok(())
}

#[test]
fn test_cyclic_graph_is_rejected() -> Result<()> {
    let insts = [mov_imm(Operand::grf(0), 0), mov_imm(Operand::grf(1), 1)];
    let mut graph = DependencyGraph::new();
    let a = graph.add_node(&insts[0], 2, Latency::uniform(1));
    let b = graph.add_node(&insts[1], 2, Latency::uniform(1));
    graph.add_dependency(a, b, Latency::uniform(1))?;
    graph.add_dependency(b, a, Latency::uniform(1))?;

    assert!(matches!(
        graph.compute_delays(Direction::TopDown, false),
        Err(Error::GraphError(_))
    ));
    assert!(graph.verify().is_err());

    let config = SchedulerConfig::post_allocation(Generation::new(7));
    let result = Scheduler::new(&graph, &config, RegisterPressureTracker::disabled()).run();
    assert!(matches!(
        result,
        Err(Error::SchedulingStalled {
            scheduled: 0,
            total: 2
        })
    ));
    Ok(())
}

#[test]
fn test_unmodeled_operand_becomes_barrier() -> Result<()> {
    let config = SchedulerConfig::post_allocation(Generation::new(8));
    let block = vec![
        mov_imm(Operand::grf(0), 0),
        Instruction::build(Opcode::Mov)
            .dst(Operand::grf(1))
            .src0(Operand::Unmodeled(42))
            .build(),
        mov_imm(Operand::grf(2), 0),
    ];
    let scheduler = scheduler(config, 0)?;
    let scheduled = scheduler.schedule_block(&ShaderBlock::new(2, block))?;

    assert_eq!(scheduled.order, vec![0, 1, 2]);
    assert_eq!(scheduler.events().count_kind(EventKind::UnmodeledOperand), 1);
    assert_eq!(scheduler.events().filter_block(2).count(), 2);
    Ok(())
}

#[test]
fn test_malformed_block_reports_error() -> Result<()> {
    let scheduler = scheduler(SchedulerConfig::post_allocation(Generation::new(7)), 0)?;
    let block = ShaderBlock::new(5, vec![mov_imm(Operand::vgrf(0, 0), 0)]);

    assert!(matches!(
        scheduler.schedule_block(&block),
        Err(Error::Malformed { .. })
    ));
    assert_eq!(scheduler.events().errors().count(), 1);
    assert!(matches!(
        scheduler.schedule_blocks(&[block]),
        Err(Error::Malformed { .. })
    ));
    Ok(())
}
