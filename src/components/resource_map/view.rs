//! The resource map view: toolbar, breadcrumbs, canvas and details panel
//! wired to the graph pipeline.
//!
//! Selection and grouping are read from the page URL on mount and written
//! back on every change. Everything else lives in signals owned here.

use leptos::prelude::*;
use log::{debug, warn};

use super::component::ResourceMapCanvas;
use super::config::MapConfig;
use super::graph::{GraphFilter, GraphNode, GroupBy};
use super::pipeline::{
	FilterToggles, build_full, build_visible, effective_group_by, expand_all_offered,
	keep_expand_all, kinds_in, namespaces_in,
};
use super::search::{Breadcrumb, SearchQuery, selection_breadcrumbs};
use super::selection::{Selection, SelectionSnapshot};
use super::sources::{GraphData, SourceSelection, merge_sources};
use super::view_state::{
	QueryParamsStore, read_group_by, read_selection, write_group_by, write_selection,
};

const GROUP_BY_CHOICES: [(GroupBy, &str); 4] = [
	(GroupBy::None, "None"),
	(GroupBy::Namespace, "Namespace"),
	(GroupBy::Instance, "Instance"),
	(GroupBy::Node, "Node"),
];

/// What the details panel shows for one node.
struct Details {
	title: String,
	rows: Vec<(&'static str, String)>,
}

fn describe(node: &GraphNode) -> Details {
	match node {
		GraphNode::Object(object) => {
			let mut rows = vec![("Kind", object.kind.clone())];
			if let Some(namespace) = &object.namespace {
				rows.push(("Namespace", namespace.clone()));
			}
			if let Some(instance) = &object.instance {
				rows.push(("Instance", instance.clone()));
			}
			if let Some(host) = &object.host {
				rows.push(("Node", host.clone()));
			}
			rows.push(("Status", object.status.label().to_string()));
			Details {
				title: object.label.clone(),
				rows,
			}
		}
		GraphNode::Group(group) => Details {
			title: group.label.clone(),
			rows: vec![
				("Group", group.kind.label().to_string()),
				("Resources", group.object_count.to_string()),
				("Status", group.status.label().to_string()),
			],
		},
	}
}

/// Interactive map of the resources in `data`.
#[component]
pub fn ResourceMapView(
	/// Resources and relationships of every source.
	#[prop(into)]
	data: Signal<GraphData>,
	/// Defaults and tuning; see [`MapConfig`].
	#[prop(optional)]
	config: MapConfig,
	/// Filters applied before the toolbar's own.
	#[prop(optional)]
	default_filters: Vec<GraphFilter>,
) -> impl IntoView {
	let store = QueryParamsStore;
	let default_group_by = config.default_group_by;
	let initial_group_by = read_group_by(&store, default_group_by).unwrap_or_else(|err| {
		warn!("resource-map: {}, grouping by {}", err, default_group_by);
		default_group_by
	});

	let group_by = RwSignal::new(initial_group_by);
	let selection = RwSignal::new(Selection::new(read_selection(&store).as_deref()));
	let expand_all = RwSignal::new(false);
	let toggles = RwSignal::new(FilterToggles {
		namespaces: config.default_namespaces.iter().cloned().collect(),
		..Default::default()
	});
	let sources = RwSignal::new(SourceSelection::default());
	let query = RwSignal::new(SearchQuery::default());

	let merged = Memo::new(move |_| data.with(|d| sources.with(|s| merge_sources(&d.sources, s))));
	let full = Memo::new(move |_| {
		let filters = toggles.with(|t| t.filters(&default_filters));
		let applied = toggles.with(|t| effective_group_by(group_by.get(), t));
		merged.with(|m| build_full(&m.nodes, &m.edges, &filters, applied))
	});
	let visible = Memo::new(move |_| {
		let selected = selection.with(|s| s.selected().map(str::to_string));
		full.with(|f| build_visible(f, selected.as_deref(), expand_all.get()))
	});
	let snapshot = Memo::new(move |_| {
		full.with(|f| selection.with(|s| SelectionSnapshot::derive(&f.graph, &f.lookup, s)))
	});
	let highlights = Memo::new(move |_| {
		snapshot.with(|s| {
			full.with(|f| visible.with(|v| s.highlights.visible_in(&f.graph, &v.graph)))
		})
	});
	let highlighted_edges = Memo::new(move |_| {
		snapshot.with(|s| {
			full.with(|f| visible.with(|v| s.highlights.visible_edges(&f.graph, &v.graph)))
		})
	});

	Effect::new(move |_| {
		let graph = full.with(|f| f.graph.clone());
		let mut current = selection.get_untracked();
		if current.reconcile(&graph) {
			selection.set(current);
		}
	});

	Effect::new(move |_| {
		let selected = selection.with(|s| s.selected().map(str::to_string));
		write_selection(&mut QueryParamsStore, selected.as_deref());
	});
	Effect::new(move |_| write_group_by(&mut QueryParamsStore, group_by.get(), default_group_by));

	let threshold = config.expand_all_threshold;
	Effect::new(move |_| {
		let size = visible.with(|v| v.size);
		let on = expand_all.get_untracked();
		if on && !keep_expand_all(on, size, threshold) {
			debug!("resource-map: {} elements exceed {}, collapsing", size, threshold);
			expand_all.set(false);
		}
	});

	let selected_id = Signal::derive(move || selection.with(|s| s.selected().map(str::to_string)));
	let view_key = Signal::derive(move || (selected_id.get(), group_by.get(), expand_all.get()));

	let on_select = Callback::new(move |id: String| {
		selection.update(|s| {
			s.select(Some(&id));
		});
	});
	let on_background = Callback::new(move |_: ()| {
		let graph = full.with_untracked(|f| f.graph.clone());
		selection.update(|s| {
			s.background_click(&graph);
		});
	});

	let group_by_chips = move || {
		let available = toggles.with(FilterToggles::namespace_grouping_available);
		GROUP_BY_CHOICES
			.into_iter()
			.filter(move |(choice, _)| available || *choice != GroupBy::Namespace)
			.map(|(choice, label)| {
				view! {
					<button
						class="chip"
						class:active=move || toggles.with(|t| effective_group_by(group_by.get(), t)) == choice
						on:click=move |_| group_by.set(choice)
					>
						{label}
					</button>
				}
			})
			.collect_view()
	};

	let namespace_chips = move || {
		merged
			.with(|m| namespaces_in(&m.nodes))
			.into_iter()
			.map(|namespace| {
				let label = namespace.clone();
				let active = namespace.clone();
				view! {
					<button
						class="chip"
						class:active=move || toggles.with(|t| t.namespaces.contains(&active))
						on:click=move |_| toggles.update(|t| t.toggle_namespace(&namespace))
					>
						{label}
					</button>
				}
			})
			.collect_view()
	};

	let kind_chips = move || {
		merged
			.with(|m| kinds_in(&m.nodes))
			.into_iter()
			.map(|kind| {
				let label = kind.clone();
				let active = kind.clone();
				view! {
					<button
						class="chip"
						class:active=move || toggles.with(|t| t.kinds.contains(&active))
						on:click=move |_| toggles.update(|t| t.toggle_kind(&kind))
					>
						{label}
					</button>
				}
			})
			.collect_view()
	};

	let source_chips = move || {
		data.with(|d| {
			d.sources
				.iter()
				.map(|source| (source.id.clone(), source.label.clone()))
				.collect::<Vec<_>>()
		})
		.into_iter()
		.map(|(id, label)| {
			let active = id.clone();
			view! {
				<button
					class="chip"
					class:active=move || sources.with(|s| s.is_selected(&active))
					on:click=move |_| sources.update(|s| s.toggle(&id))
				>
					{label}
				</button>
			}
		})
		.collect_view()
	};

	let search_limit = config.search_limit;
	let search_results = move || {
		full.with(|f| {
			query.with(|q| {
				q.results(&f.filtered.nodes, search_limit)
					.into_iter()
					.map(|object| (object.id.clone(), object.kind.clone(), object.label.clone()))
					.collect::<Vec<_>>()
			})
		})
		.into_iter()
		.map(|(id, kind, label)| {
			view! {
				<li on:click=move |_| {
					let mut chosen = selection.get_untracked();
					query.update(|q| {
						q.choose(&mut chosen, &id);
					});
					selection.set(chosen);
				}>
					<span class="kind">{kind}</span>
					" "
					{label}
				</li>
			}
		})
		.collect_view()
	};

	let breadcrumbs = move || {
		full.with(|f| selection.with(|s| selection_breadcrumbs(&f.graph, s.selected())))
			.into_iter()
			.map(|Breadcrumb { id, label }| {
				view! {
					<button
						class="crumb"
						on:click=move |_| selection.update(|s| {
							s.select(Some(&id));
						})
					>
						{label}
					</button>
				}
			})
			.collect_view()
	};

	let default_selection = config.default_selection.clone();
	let details_panel = move || {
		let details = full.with(|f| {
			selection.with(|s| s.selected().and_then(|id| f.graph.node(id)).map(describe))
		})?;
		let default_selection = default_selection.clone();
		let close = move |_| {
			let graph = full.with_untracked(|f| f.graph.clone());
			selection.update(|s| {
				s.close_details(&graph, default_selection.as_deref());
			});
		};
		Some(view! {
			<aside class="details">
				<header>
					<h2>{details.title}</h2>
					<button class="close" title="Close" on:click=close>"×"</button>
				</header>
				<dl>
					{details
						.rows
						.into_iter()
						.map(|(key, value)| view! { <dt>{key}</dt><dd>{value}</dd> })
						.collect_view()}
				</dl>
			</aside>
		})
	};

	view! {
		<div class="resource-map">
			<div class="toolbar">
				<div class="chips group-by">
					<span class="chip-label">"Group by"</span>
					{group_by_chips}
				</div>
				<div class="chips filters">
					<button
						class="chip"
						class:active=move || toggles.with(|t| t.has_errors)
						on:click=move |_| toggles.update(|t| t.has_errors = !t.has_errors)
					>
						"Errors"
					</button>
					{namespace_chips}
				</div>
				<div class="chips kinds">{kind_chips}</div>
				<div class="chips sources">{source_chips}</div>
				<Show when=move || {
					expand_all.get() || expand_all_offered(visible.with(|v| v.size), threshold)
				}>
					<button
						class="chip"
						class:active=move || expand_all.get()
						on:click=move |_| expand_all.update(|on| *on = !*on)
					>
						"Expand all"
					</button>
				</Show>
				<div class="search">
					<input
						type="search"
						placeholder="Search resources"
						prop:value=move || query.with(|q| q.text().to_string())
						on:input=move |ev| query.update(|q| q.set(event_target_value(&ev)))
					/>
					<ul class="search-results">{search_results}</ul>
				</div>
			</div>
			<nav class="breadcrumbs">{breadcrumbs}</nav>
			<div class="map-body">
				<ResourceMapCanvas
					visible=visible
					highlights=highlights
					highlighted_edges=highlighted_edges
					selected=selected_id
					view_key=view_key
					layout_config=config.layout.clone()
					padding=config.viewport_padding
					on_select=on_select
					on_background=on_background
				/>
				{details_panel}
			</div>
		</div>
	}
}
