//! History chart page.
//!
//! The persisted samples are embedded into the page as JSON; the browser
//! draws them with Chart.js along with overall and last-60-sample min/max
//! markers.

use crate::history::HistorySeries;

const DATA_PLACEHOLDER: &str = "__HISTORY_DATA__";

/// Render the chart page for `series`.
pub fn render(series: &HistorySeries) -> String {
    let data = serde_json::to_string(series).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to encode history for chart");
        "{\"timestamps\":[],\"temperatures\":[],\"humidities\":[]}".to_string()
    });
    // Keep the payload from closing the surrounding <script> element
    let data = data.replace("</", "<\\/");
    HISTORY_HTML.replace(DATA_PLACEHOLDER, &data)
}

const HISTORY_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Thermostat History</title>
    <script src="https://cdn.jsdelivr.net/npm/chart.js@4"></script>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Ubuntu, sans-serif;
            background: #f4f6fb;
            color: #333;
            margin: 0;
            padding: 20px;
        }

        .container {
            max-width: 1200px;
            margin: 0 auto;
        }

        .card {
            background: white;
            border-radius: 15px;
            padding: 25px;
            box-shadow: 0 10px 30px rgba(0,0,0,0.1);
            margin-bottom: 20px;
        }

        .stats {
            display: grid;
            grid-template-columns: repeat(auto-fit, minmax(220px, 1fr));
            gap: 10px;
        }

        .stat-label {
            font-weight: 600;
            color: #666;
        }

        .empty {
            text-align: center;
            color: #999;
        }
    </style>
</head>
<body>
    <div class="container">
        <h1>Temperature &amp; Humidity History</h1>
        <div class="card">
            <canvas id="history"></canvas>
            <p class="empty" id="empty" hidden>No samples recorded yet.</p>
        </div>
        <div class="card stats" id="stats"></div>
    </div>

    <script>
        const history = __HISTORY_DATA__;
        const WINDOW = 60;

        function extremes(values) {
            if (values.length === 0) return null;
            return { min: Math.min(...values), max: Math.max(...values) };
        }

        function stat(label, value, unit) {
            const div = document.createElement('div');
            div.innerHTML = `<span class="stat-label">${label}</span> ${value.toFixed(2)}${unit}`;
            document.getElementById('stats').appendChild(div);
        }

        function flatLine(label, value, color) {
            return {
                label: label,
                data: history.timestamps.map(() => value),
                borderColor: color,
                borderDash: [6, 4],
                borderWidth: 1,
                pointRadius: 0,
            };
        }

        if (history.timestamps.length === 0) {
            document.getElementById('empty').hidden = false;
        } else {
            const labels = history.timestamps.map(ts => new Date(ts).toLocaleTimeString());
            const temp = extremes(history.temperatures);
            const hum = extremes(history.humidities);
            const temp60 = extremes(history.temperatures.slice(-WINDOW));
            const hum60 = extremes(history.humidities.slice(-WINDOW));

            new Chart(document.getElementById('history'), {
                type: 'line',
                data: {
                    labels: labels,
                    datasets: [
                        { label: 'Humidity (%)', data: history.humidities, borderColor: 'blue', pointRadius: 0 },
                        { label: 'Temperature (°C)', data: history.temperatures, borderColor: 'red', pointRadius: 0 },
                        flatLine('Temperature max (last 60)', temp60.max, 'red'),
                        flatLine('Temperature min (last 60)', temp60.min, 'red'),
                        flatLine('Humidity max (last 60)', hum60.max, 'blue'),
                        flatLine('Humidity min (last 60)', hum60.min, 'blue'),
                    ],
                },
                options: { animation: false, interaction: { mode: 'index', intersect: false } },
            });

            stat('Latest temperature', history.temperatures[history.temperatures.length - 1], '°C');
            stat('Latest humidity', history.humidities[history.humidities.length - 1], '%');
            stat('Temperature max', temp.max, '°C');
            stat('Temperature min', temp.min, '°C');
            stat('Humidity max', hum.max, '%');
            stat('Humidity min', hum.min, '%');
        }
    </script>
</body>
</html>"#;
