use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use flight_offer_transformer::transform;
use serde_json::{json, Value};

// Build a synthetic air-shopping response with the given number of offers,
// each referencing a pair of connecting segments.
fn synthetic_response(offer_count: usize) -> Value {
    let mut offers = Vec::with_capacity(offer_count);
    let mut segments = Vec::with_capacity(offer_count * 2);

    for i in 0..offer_count {
        let out_key = format!("SEG{}A", i);
        let in_key = format!("SEG{}B", i);

        for (key, dep, arr, dep_time, arr_time) in [
            (&out_key, "NBO", "DXB", "10:00", "16:10"),
            (&in_key, "DXB", "LHR", "18:30", "22:45"),
        ] {
            segments.push(json!({
                "SegmentKey": key,
                "Departure": {
                    "AirportCode": {"value": dep},
                    "Date": "2025-11-02",
                    "Time": dep_time
                },
                "Arrival": {
                    "AirportCode": {"value": arr},
                    "Date": "2025-11-02",
                    "Time": arr_time
                },
                "MarketingCarrier": {
                    "AirlineID": {"value": "EK"},
                    "Name": "Emirates",
                    "FlightNumber": {"value": format!("{:03}", 100 + i)}
                },
                "FlightDetail": {"FlightDuration": {"Value": "PT6H10M"}},
                "Equipment": {"AircraftCode": {"value": "388"}}
            }));
        }

        offers.push(json!({
            "OfferID": {"value": format!("OFFER{}", i)},
            "PricedOffer": {
                "OfferPrice": [{
                    "RequestedDate": {
                        "PriceDetail": {
                            "TotalAmount": {
                                "SimpleCurrencyPrice": {"value": 750.0 + i as f64, "Code": "USD"}
                            },
                            "BaseAmount": {"value": 600.0, "Code": "USD"},
                            "Taxes": {"Total": {"value": 150.0, "Code": "USD"}}
                        }
                    },
                    "Associations": [{
                        "ApplicableFlight": {
                            "FlightSegmentReference": [
                                {"ref": out_key},
                                {"ref": in_key}
                            ]
                        }
                    }]
                }]
            }
        }));
    }

    json!({
        "OffersGroup": {
            "AirlineOffers": [{
                "Owner": {"value": "EK"},
                "AirlineOffer": offers
            }]
        },
        "DataLists": {
            "FlightSegmentList": {"FlightSegment": segments}
        }
    })
}

pub fn transform_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("air_shopping_transform");

    for offer_count in [10, 100, 500].iter() {
        let response = synthetic_response(*offer_count);
        // Every synthetic offer must survive the transform, otherwise the
        // benchmark measures the drop path instead of the aggregation.
        assert_eq!(transform(&response).len(), *offer_count);
        group.bench_with_input(
            BenchmarkId::from_parameter(offer_count),
            &response,
            |b, response| {
                b.iter(|| black_box(transform(black_box(response))));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, transform_benchmark);
criterion_main!(benches);
