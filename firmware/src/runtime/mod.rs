use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Level, Output, Pull, Speed};
use embassy_sync::channel::Channel;
use embassy_sync::mutex::Mutex;

use lock_core::button::{ATTENTION_BUTTON, FUNCTION_BUTTON, LOCK_BUTTON};

use crate::app::{self, AppContext};
use crate::leds::GpioIndicators;
use crate::net::{NetState, SharedNetState};

mod app_task;
mod button_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

pub(super) static EVENT_QUEUE: app::EventQueue = Channel::new();
pub(super) static NET_STATE: SharedNetState = Mutex::new(NetState::new());

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        PA5,
        PA6,
        PB0,
        PB1,
        PB2,
        EXTI0,
        EXTI1,
        EXTI2,
        ..
    } = hal::init(config);

    let indicators = GpioIndicators::new(
        Output::new(PA5, Level::Low, Speed::Low),
        Output::new(PA6, Level::Low, Speed::Low),
    );
    let ctx = AppContext::new(EVENT_QUEUE.sender(), indicators);

    spawner
        .spawn(app_task::run(EVENT_QUEUE.receiver(), &NET_STATE, ctx))
        .expect("failed to spawn application task");

    spawner
        .spawn(button_task::watch(
            ExtiInput::new(PB0, EXTI0, Pull::Up),
            FUNCTION_BUTTON,
            EVENT_QUEUE.sender(),
        ))
        .expect("failed to spawn function button task");
    spawner
        .spawn(button_task::watch(
            ExtiInput::new(PB1, EXTI1, Pull::Up),
            LOCK_BUTTON,
            EVENT_QUEUE.sender(),
        ))
        .expect("failed to spawn lock button task");
    spawner
        .spawn(button_task::watch(
            ExtiInput::new(PB2, EXTI2, Pull::Up),
            ATTENTION_BUTTON,
            EVENT_QUEUE.sender(),
        ))
        .expect("failed to spawn attention button task");

    core::future::pending::<()>().await;
}
