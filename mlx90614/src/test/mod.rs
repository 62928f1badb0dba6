// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
mod i2c_mock;

pub(crate) use i2c_mock::{MockDelay, MockError, MockSensorBus, Operation};
