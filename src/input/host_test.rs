use std::error::Error;

use super::mock::{MockDevice, MockHost};
use super::{EnabledSensors, HostError, HostInput, SensorType};

#[test]
fn test_enabled_sensors() -> Result<(), Box<dyn Error>> {
    let mut sensors = EnabledSensors::default();
    assert!(matches!(
        sensors.check(1, SensorType::Gyroscope),
        Err(HostError::SensorDisabled(SensorType::Gyroscope))
    ));

    sensors.set(1, SensorType::Gyroscope, true);
    sensors.set(2, SensorType::Gyroscope, true);
    sensors.check(1, SensorType::Gyroscope)?;
    assert!(!sensors.contains(1, SensorType::Accelerometer));

    sensors.set(1, SensorType::Gyroscope, false);
    assert!(!sensors.contains(1, SensorType::Gyroscope));

    sensors.remove_device(2);
    assert!(!sensors.contains(2, SensorType::Gyroscope));
    Ok(())
}

#[test]
fn test_sensor_reads_need_enabling() -> Result<(), Box<dyn Error>> {
    let host = MockHost::new();
    let instance = host.plug(MockDevice::joycon_left());
    let handle = host.open(instance)?;
    host.set_sensor(instance, SensorType::Accelerometer, [0.0, 0.0, 9.8]);

    let result = host.sensor_data(handle, SensorType::Accelerometer);
    assert!(
        matches!(result, Err(HostError::SensorDisabled(_))),
        "reads are refused before the sensor is on, got {result:?}"
    );

    host.set_sensor_enabled(handle, SensorType::Accelerometer, true)?;
    assert_eq!(host.sensor_data(handle, SensorType::Accelerometer)?, [0.0, 0.0, 9.8]);
    assert!(
        host.sensor_data(handle, SensorType::Gyroscope).is_err(),
        "each sensor is enabled on its own"
    );

    host.set_sensor_enabled(handle, SensorType::Accelerometer, false)?;
    assert!(host.sensor_data(handle, SensorType::Accelerometer).is_err());
    Ok(())
}
