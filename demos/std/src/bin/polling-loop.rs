use embassy_executor::{Executor, Spawner};
use embassy_time::{Duration, Instant};
use smart_delay::{
    SmartDelay, Status, TickSource,
    impl_embassy_time::{EmbassyTimeTicks, TickUnit},
    sequence::{Phase, Sequencer},
};
use static_cell::StaticCell;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const DEFINED_PHASES: [u32; 4] = [2000, 1000, 3000, 1000];
const SEQUENCE_STEPS: i32 = 10;

macro_rules! log {
    ($($arg:tt)*) => {
        println!("{:10} {}", Instant::now().as_millis(), format_args!($($arg)*))
    };
}

trait Scenario {
    fn poll(&mut self, id: i32, now: u32);
}

fn report(id: i32, sd: &SmartDelay, duration: u32, now: u32) {
    let diff = now.wrapping_sub(sd.start_time());
    log!(
        "test[{id}] elapsed step {} (now {now} started {} diff {diff} error {})",
        sd.step(),
        sd.start_time(),
        diff as i64 - duration as i64,
    );
}

fn execute(id: i32, step: i32) {
    log!("test[{id}] execute step {step}");
}

fn finish(id: i32) {
    log!("test[{id}] finish");
}

fn alternating(step: i32) -> u32 {
    if step % 2 == 0 { 1000 } else { 2000 }
}

/// One delay, polled on every iteration.
struct Simple {
    delay: SmartDelay,
    duration: u32,
}

impl Scenario for Simple {
    fn poll(&mut self, id: i32, now: u32) {
        if self.delay.is_elapsed(id, self.duration, now) {
            report(id, &self.delay, self.duration, now);
        }
    }
}

/// Fixed phases written out one after the other. Phases that already passed report
/// `Invalid` and are skipped until the live phase is reached.
struct DefinedSteps {
    delay: SmartDelay,
    announced: usize,
}

impl Scenario for DefinedSteps {
    fn poll(&mut self, id: i32, now: u32) {
        for (step, &duration) in DEFINED_PHASES.iter().enumerate() {
            if self.announced == step {
                self.announced += 1;
                execute(id, step as i32);
            }
            match self.delay.poll(id, duration, now, step as i32) {
                Status::Elapsed => report(id, &self.delay, duration, now),
                Status::Waiting => return,
                Status::Invalid => {}
            }
        }

        self.announced = 0;
        finish(id);
    }
}

/// Every phase is polled on every iteration, only the live one is accepted.
struct SequentialAll {
    delay: SmartDelay,
    step: i32,
    executed: bool,
}

impl Scenario for SequentialAll {
    fn poll(&mut self, id: i32, now: u32) {
        for s in 0..SEQUENCE_STEPS {
            if s == self.step && !self.executed {
                self.executed = true;
                execute(id, s);
            }
            let duration = alternating(s);
            if self.delay.poll(id, duration, now, s) == Status::Elapsed {
                report(id, &self.delay, duration, now);
                self.executed = false;
                self.step = (self.step + 1) % SEQUENCE_STEPS;
                if self.step == 0 {
                    finish(id);
                }
            }
        }
    }
}

/// Only the live phase is polled.
struct SequentialUnique {
    sequencer: Sequencer,
}

impl Scenario for SequentialUnique {
    fn poll(&mut self, id: i32, now: u32) {
        match self.sequencer.poll_with(alternating, now) {
            Phase::Started { step } => execute(id, step),
            Phase::Elapsed { step, wrapped } => {
                report(id, self.sequencer.delay(), alternating(step), now);
                if wrapped {
                    finish(id);
                }
            }
            Phase::Waiting { .. } => {}
            Phase::Invalid => log!("test[{id}] invalid usage"),
        }
    }
}

/// A delay on a counter that starts half a delay before wraparound.
struct Overflow {
    delay: SmartDelay,
    duration: u32,
    ticks: EmbassyTimeTicks,
}

impl Overflow {
    fn new(duration: u32) -> Self {
        Self {
            delay: SmartDelay::new(),
            duration,
            ticks: EmbassyTimeTicks::with_offset(TickUnit::Millis, u32::MAX - duration / 2),
        }
    }
}

impl Scenario for Overflow {
    fn poll(&mut self, id: i32, _now: u32) {
        let now = self.ticks.now_ticks();
        if self.delay.is_elapsed(id, self.duration, now) {
            report(id, &self.delay, self.duration, now);
            self.ticks.restart();
        }
    }
}

#[embassy_executor::task]
async fn main_task(_spawner: Spawner) {
    let clock = EmbassyTimeTicks::new(TickUnit::Millis);
    let mut scenarios: Vec<Box<dyn Scenario>> = vec![
        Box::new(Simple {
            delay: SmartDelay::new(),
            duration: 1000,
        }),
        Box::new(Simple {
            delay: SmartDelay::new(),
            duration: 2000,
        }),
        Box::new(DefinedSteps {
            delay: SmartDelay::new(),
            announced: 0,
        }),
        Box::new(SequentialAll {
            delay: SmartDelay::new(),
            step: 0,
            executed: false,
        }),
        Box::new(SequentialUnique {
            sequencer: Sequencer::new(4, SEQUENCE_STEPS),
        }),
        Box::new(Overflow::new(6000)),
    ];

    log!("start {} tests", scenarios.len());

    loop {
        let now = clock.now_ticks();
        for (id, scenario) in scenarios.iter_mut().enumerate() {
            scenario.poll(id as i32, now);
        }

        embassy_time::Timer::after(POLL_INTERVAL).await;
    }
}

static EXECUTOR: StaticCell<Executor> = StaticCell::new();

fn main() {
    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        spawner.spawn(main_task(spawner)).unwrap();
    });
}
