/*!
# AICE Temperature Controller

Maintains the global reward "temperature" and per-role overrides. The value is
driven by a discrete PID loop fed with KPI error signals (emission, backlog,
SLA) on each administrative tick.

## Control law

```text
error      = emission + backlog + sla
integral  += error
derivative = error - last_error
delta      = kp * error + ki * integral + kd * derivative
T'         = clamp(T + delta, min, max)
```

All quantities are integers; replicas replaying the same ticks reach the same
temperature. The integral is never clamped: there is no anti-windup, so a
long run of same-signed errors keeps accumulating even while the output sits
on a bound. A tick whose result would not be strictly positive, or whose
arithmetic overflows, is rejected without touching any state.
*/

pub mod controller;
pub mod error;
pub mod pid;

pub use controller::{TemperatureConfig, TemperatureController, TemperatureSnapshot};
pub use error::{Result, TemperatureError};
pub use pid::{Bounds, KpiErrors, PidGains, PidStep};
