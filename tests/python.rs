//! The Python surface, driven through an embedded interpreter.
#![cfg(feature = "python-embed")]

use gpiod::mock::MockChip;
use gpiod::python::{register, PyChip};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyModule};

fn run(code: &str, setup: impl FnOnce(Python<'_>, &Bound<'_, PyDict>) -> PyResult<()>) {
    Python::with_gil(|py| {
        let module = PyModule::new_bound(py, "_gpiod")?;
        register(&module)?;
        let globals = PyDict::new_bound(py);
        globals.set_item("gpiod", &module)?;
        setup(py, &globals)?;
        py.run_bound(code, Some(&globals), None)
    })
    .unwrap_or_else(|err| panic!("python code failed: {err}"));
}

#[test]
fn flags_accept_integers_and_reject_text() {
    run(
        r#"
req = gpiod.line_request()
req.flags = 0xFFFFFFFF
assert req.flags == 0xFFFFFFFF
req.flags = gpiod.line_request.FLAG_ACTIVE_LOW | gpiod.line_request.FLAG_OPEN_DRAIN
assert req.flags == 0b101

for bad, exc in (("abc", TypeError), (None, TypeError), (-1, OverflowError), (1 << 32, OverflowError)):
    try:
        req.flags = bad
    except exc:
        pass
    else:
        raise AssertionError(repr(bad))
assert req.flags == 0b101
"#,
        |_, _| Ok(()),
    );
}

#[test]
fn constants_are_class_attributes() {
    run(
        r#"
assert gpiod.chip.OPEN_LOOKUP == 1
assert gpiod.chip.OPEN_BY_NUMBER == 5
assert gpiod.line.DIRECTION_OUTPUT == 2
assert gpiod.line.ACTIVE_HIGH == 2
assert gpiod.line_request.EVENT_BOTH_EDGES == 6
assert gpiod.line_event.FALLING_EDGE == 2
assert gpiod.line_bulk.MAX_LINES == 64
if gpiod.HAS_LINE_CONFIG:
    assert gpiod.line.BIAS_PULL_DOWN == 4
    assert gpiod.line_request.FLAG_BIAS_PULL_UP == 1 << 5
else:
    assert not hasattr(gpiod.line, "set_config")
"#,
        |_, _| Ok(()),
    );
}

#[test]
fn empty_handles() {
    run(
        r#"
import datetime

assert not gpiod.chip()
assert not gpiod.line()
assert not gpiod.line_bulk()
assert gpiod.line() == gpiod.line()
try:
    gpiod.line().offset()
except RuntimeError:
    pass
else:
    raise AssertionError("empty line has an offset")

event = gpiod.line_event()
assert event.timestamp == datetime.timedelta(0)
event.timestamp = datetime.timedelta(seconds=1, microseconds=500)
assert event.timestamp == datetime.timedelta(seconds=1, microseconds=500)
assert not event.source
"#,
        |_, _| Ok(()),
    );
}

#[test]
fn default_value_defaults_to_zero() {
    let mock = MockChip::new("gpiochip0", "mock", 8).with_line_name(2, "led");
    run(
        r#"
req = gpiod.line_request()
req.consumer = "python"
req.request_type = gpiod.line_request.DIRECTION_OUTPUT

line = chip.find_line("led")
line.request(req)
assert line.is_requested()
assert line.consumer() == "python"
assert line.direction() == gpiod.line.DIRECTION_OUTPUT
assert line.get_value() == 0
line.set_value(1)
assert line.get_chip() == chip

bulk = chip.get_lines([4, 5])
bulk.request(req)
assert bulk.get_values() == [0, 0]
"#,
        |py, globals| globals.set_item("chip", Py::new(py, PyChip::from(mock.to_chip()?))?),
    );

    let requests = mock.requests();
    assert_eq!(requests[0].default_values, vec![0]);
    assert_eq!(requests[1].default_values, vec![0, 0]);
    assert_eq!(mock.value(2), 1);
}

#[test]
fn bulk_iteration_keeps_lines_alive() {
    let mock = MockChip::new("gpiochip0", "mock", 4);
    run(
        r#"
it = iter(chip.get_all_lines())
assert [line.offset() for line in it] == [0, 1, 2, 3]
assert [line.offset() for line in gpiod.line_iter(chip)] == [0, 1, 2, 3]

bulk = gpiod.line_bulk([chip.get_line(1), chip.get_line(3)])
assert len(bulk) == 2 and bulk[1].offset() == 3
try:
    bulk.get(2)
except IndexError:
    pass
else:
    raise AssertionError("index past the end")
"#,
        |py, globals| globals.set_item("chip", Py::new(py, PyChip::from(mock.to_chip()?))?),
    );
}

#[test]
fn os_errors_carry_errno() {
    let mock = MockChip::new("gpiochip0", "mock", 4).with_busy_line(0, "kernel");
    run(
        r#"
import errno

req = gpiod.line_request()
req.request_type = gpiod.line_request.DIRECTION_INPUT
try:
    chip.get_line(0).request(req)
except OSError as err:
    assert err.errno == errno.EBUSY
else:
    raise AssertionError("busy line was granted")
"#,
        |py, globals| globals.set_item("chip", Py::new(py, PyChip::from(mock.to_chip()?))?),
    );
}

#[test]
fn methods_accept_keyword_arguments() {
    let mock = MockChip::new("gpiochip0", "mock", 8).with_line_name(2, "led");
    run(
        r#"
import datetime
import errno

out = gpiod.line_request()
out.consumer = "keywords"
out.request_type = gpiod.line_request.DIRECTION_OUTPUT

led = chip.find_line(name="led")
assert led == chip.get_line(offset=2)
led.request(config=out, default_val=1)
assert led.get_value() == 1
led.set_value(value=0)

edges = gpiod.line_request()
edges.request_type = gpiod.line_request.EVENT_BOTH_EDGES
button = chip.get_line(offset=3)
button.request(config=edges)
assert button.event_wait(timeout=0) is False
assert button.event_wait(timeout=datetime.timedelta(milliseconds=1)) is False
assert not chip.get_lines(offsets=[3]).event_wait(timeout=0)

bulk = gpiod.line_bulk(lines=[chip.get_line(offset=4)])
bulk.append(new_line=chip.get_line(offset=5))
assert bulk.get(offset=1).offset() == 5
bulk.request(config=out, default_vals=[1, 0])
bulk.set_values(values=[0, 1])

assert len(chip.find_lines(names=["led"])) == 1
assert [line.offset() for line in gpiod.line_iter(chip=chip)] == list(range(8))

for open_chip in (
    lambda: gpiod.chip(device="/nonexistent/gpiochip0", how=gpiod.chip.OPEN_BY_PATH),
    lambda: gpiod.chip().open(device="/nonexistent/gpiochip0", how=gpiod.chip.OPEN_BY_PATH),
):
    try:
        open_chip()
    except OSError as err:
        assert err.errno == errno.ENOENT
    else:
        raise AssertionError("missing device was opened")
"#,
        |py, globals| globals.set_item("chip", Py::new(py, PyChip::from(mock.to_chip()?))?),
    );

    let requests = mock.requests();
    assert_eq!(requests[0].default_values, vec![1]);
    assert!(requests[1].event_flags.is_some());
    assert_eq!(requests[2].offsets, vec![4, 5]);
    assert_eq!(requests[2].default_values, vec![1, 0]);
    assert_eq!((mock.value(2), mock.value(4), mock.value(5)), (0, 0, 1));
}

#[test]
fn full_bulk_raises_index_error() {
    let mock = MockChip::new("gpiochip0", "mock", 70);
    run(
        r#"
bulk = gpiod.line_bulk()
for offset in range(gpiod.line_bulk.MAX_LINES):
    bulk.append(chip.get_line(offset))
try:
    bulk.append(chip.get_line(64))
except IndexError as err:
    assert "maximum number of lines reached" in str(err)
else:
    raise AssertionError("bulk grew past its capacity")
assert len(bulk) == 64

try:
    gpiod.line_bulk([chip.get_line(offset) for offset in range(65)])
except IndexError:
    pass
else:
    raise AssertionError("oversized bulk was built")
"#,
        |py, globals| globals.set_item("chip", Py::new(py, PyChip::from(mock.to_chip()?))?),
    );
}

#[cfg(feature = "line-config")]
#[test]
fn reconfiguration_values_default_to_zero() {
    use std::time::Duration;

    use gpiod::python::PyLine;
    use gpiod::{EventType, LineRequest, RequestType};

    let mock = MockChip::new("gpiochip0", "mock", 16);
    for offset in [2, 3, 8, 9, 10, 11] {
        mock.set_input(offset, 1);
    }

    run(
        r#"
import datetime

out = gpiod.line_request()
out.request_type = gpiod.line_request.DIRECTION_OUTPUT
inp = gpiod.line_request()
inp.request_type = gpiod.line_request.DIRECTION_INPUT
OUTPUT = gpiod.line_request.DIRECTION_OUTPUT

# Each pair: first without the optional value, second with an explicit zero.
implicit, explicit = chip.get_line(0), chip.get_line(1)
for line in (implicit, explicit):
    line.request(out, 1)
implicit.set_config(OUTPUT, 0)
explicit.set_config(OUTPUT, 0, 0)

implicit, explicit = chip.get_line(2), chip.get_line(3)
for line in (implicit, explicit):
    line.request(inp)
    assert line.get_value() == 1
implicit.set_direction_output()
explicit.set_direction_output(0)
assert implicit.direction() == explicit.direction() == gpiod.line.DIRECTION_OUTPUT

implicit, explicit = chip.get_lines([4, 5]), chip.get_lines([6, 7])
for bulk in (implicit, explicit):
    bulk.request(out, [1, 1])
implicit.set_config(OUTPUT, 0)
explicit.set_config(OUTPUT, 0, [0, 0])

implicit, explicit = chip.get_lines([8, 9]), chip.get_lines([10, 11])
for bulk in (implicit, explicit):
    bulk.request(inp)
implicit.set_direction_output()
explicit.set_direction_output([0, 0])
assert implicit.get_values() == explicit.get_values() == [0, 0]

events = button.event_read_multiple()
assert [event.event_type for event in events] == [
    gpiod.line_event.RISING_EDGE,
    gpiod.line_event.FALLING_EDGE,
]
assert events[1].timestamp == datetime.timedelta(seconds=2)
assert all(event.source == button for event in events)

watched = chip.get_line(13)
assert not watched.is_used()
held = other.get_line(13)
held.request(inp)
assert not watched.is_used()
watched.update()
assert watched.is_used()
"#,
        |py, globals| {
            let chip = mock.to_chip()?;
            let button = chip.get_line(12)?;
            button.request(&LineRequest::new("buttons", RequestType::EventBothEdges), 0)?;
            mock.push_event(12, EventType::RisingEdge, Duration::from_secs(1));
            mock.push_event(12, EventType::FallingEdge, Duration::from_secs(2));

            globals.set_item("button", Py::new(py, PyLine::from(button))?)?;
            globals.set_item("chip", Py::new(py, PyChip::from(chip))?)?;
            globals.set_item("other", Py::new(py, PyChip::from(mock.to_chip()?))?)
        },
    );

    for (implicit, explicit) in [(0, 1), (2, 3), (4, 6), (5, 7), (8, 10), (9, 11)] {
        assert_eq!(mock.value(implicit), 0, "line {implicit}");
        assert_eq!(mock.value(explicit), 0, "line {explicit}");
        assert_eq!(mock.line_flags(implicit), mock.line_flags(explicit));
    }
}
